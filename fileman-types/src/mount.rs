// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One entry of the kernel mount table.
///
/// Values are rebuilt from `/proc/mounts` on every query and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    /// Backing device (e.g. "/dev/sda1", "tmpfs")
    pub device: String,

    /// Directory the filesystem is mounted on
    pub mount_path: PathBuf,

    /// Filesystem type (e.g. "ext4", "vfat", "fuse")
    pub fs_type: String,

    /// Mount options in table order (e.g. ["rw", "nosuid", "relatime"])
    pub options: Vec<String>,

    pub dump: u32,

    pub pass: u32,
}

impl MountPoint {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|candidate| {
            candidate == option
                || candidate
                    .split_once('=')
                    .is_some_and(|(key, _)| key == option)
        })
    }

    /// `rw` present and `ro` absent.
    pub fn is_read_write(&self) -> bool {
        self.has_option("rw") && !self.has_option("ro")
    }

    pub fn is_read_only(&self) -> bool {
        !self.is_read_write()
    }

    /// Whether `path` lies on or below this mount's directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.mount_path)
    }

    pub fn options_string(&self) -> String {
        self.options.join(",")
    }
}

/// Pick the mount whose directory is the longest prefix of `path`.
///
/// Later entries win ties, matching the kernel's stacking order.
pub fn mount_point_for<'a>(mounts: &'a [MountPoint], path: &Path) -> Option<&'a MountPoint> {
    mounts
        .iter()
        .filter(|mount| mount.contains(path))
        .fold(None, |best: Option<&MountPoint>, mount| match best {
            Some(current)
                if current.mount_path.components().count()
                    > mount.mount_path.components().count() =>
            {
                Some(current)
            }
            _ => Some(mount),
        })
}
