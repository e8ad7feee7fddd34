// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashSet;
use std::path::Path;

use enumflags2::BitFlags;
use fileman_types::{MountPoint, StorageVolume, VolumeFlag};
use tracing::debug;

use super::{DiscoveryConfig, describe_mount_path, mark_primary};

const EXCLUDED_FS_TYPES: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "rootfs",
    "rpc_pipefs",
    "securityfs",
    "selinuxfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
    "nfs",
    "nfs4",
    "cifs",
    "smb3",
    "smbfs",
    "9p",
    "ceph",
    "sshfs",
];

/// Filesystem types that present another filesystem's storage.
const EMULATED_FS_TYPES: &[&str] = &["fuse", "sdcardfs", "esdfs"];

pub(crate) fn is_pseudo_fs_type(fs_type: &str) -> bool {
    EXCLUDED_FS_TYPES.contains(&fs_type) || fs_type.starts_with("fuse.")
}

fn is_emulated(mount: &MountPoint) -> bool {
    EMULATED_FS_TYPES.contains(&mount.fs_type.as_str()) || mount.device == "/dev/fuse"
}

/// Reduce a mount table to user-relevant storage volumes.
///
/// `size_of` reports a mount's capacity; mounts it cannot size are dropped
/// along with those under `config.min_size_bytes`. The first mount of each
/// backing device wins.
pub fn scan_mount_points<F>(
    mounts: &[MountPoint],
    config: &DiscoveryConfig,
    size_of: F,
) -> Vec<StorageVolume>
where
    F: Fn(&Path) -> Option<u64>,
{
    let mut seen_devices = HashSet::new();
    let mut volumes = Vec::new();

    for mount in mounts {
        if config.is_pseudo_path(&mount.mount_path) || is_pseudo_fs_type(&mount.fs_type) {
            continue;
        }

        if mount.is_read_only() {
            debug!("Skipping read-only mount {}", mount.mount_path.display());
            continue;
        }

        if config.has_quirk_marker(&mount.options) {
            debug!("Skipping quirk-marked mount {}", mount.mount_path.display());
            continue;
        }

        if seen_devices.contains(&mount.device) {
            continue;
        }

        let Some(total_bytes) = size_of(&mount.mount_path) else {
            debug!("Skipping unsized mount {}", mount.mount_path.display());
            continue;
        };

        if total_bytes < config.min_size_bytes {
            debug!(
                "Skipping {} ({} bytes below minimum)",
                mount.mount_path.display(),
                total_bytes
            );
            continue;
        }

        seen_devices.insert(mount.device.clone());

        let (description, removable) = describe_mount_path(&mount.mount_path);
        let mut flags = BitFlags::empty();
        if removable {
            flags |= VolumeFlag::Removable;
        }
        if is_emulated(mount) {
            flags |= VolumeFlag::Emulated;
        }

        volumes.push(StorageVolume {
            mount_path: mount.mount_path.clone(),
            description: description.to_string(),
            device: mount.device.clone(),
            fs_type: mount.fs_type.clone(),
            total_bytes: Some(total_bytes),
            flags,
        });
    }

    mark_primary(&mut volumes, &config.primary_path());
    volumes
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::mounts::parse_mounts;

    const TABLE: &str = "\
/dev/sda2 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid 0 0
tmpfs /run tmpfs rw,nosuid 0 0
/dev/sda2 /home ext4 rw,relatime 0 0
/dev/sdb1 /media/usb0 vfat rw,nosuid 0 0
/dev/sdc1 /media/cdrom iso9660 ro 0 0
/dev/sdd1 /media/hidden ext4 rw,x-gvfs-hide 0 0
/dev/sde1 /media/tiny vfat rw 0 0
/dev/fuse /storage/emulated fuse rw,nosuid 0 0
/dev/fuse /storage/emulated_legacy fuse rw,nosuid 0 0
/dev/loop3 /snap/core/1 squashfs ro 0 0
";

    fn config() -> DiscoveryConfig {
        DiscoveryConfig {
            primary_path: Some(PathBuf::from("/home/user")),
            ..DiscoveryConfig::default()
        }
    }

    fn sizes(path: &Path) -> Option<u64> {
        match path.to_str()? {
            "/media/tiny" => Some(4_999_999),
            _ => Some(32_000_000_000),
        }
    }

    fn scan() -> Vec<StorageVolume> {
        let mounts = parse_mounts(TABLE).expect("parse");
        scan_mount_points(&mounts, &config(), sizes)
    }

    #[test]
    fn never_reports_a_device_twice() {
        let volumes = scan();
        let mut devices: Vec<_> = volumes.iter().map(|volume| volume.device.clone()).collect();
        let before = devices.len();
        devices.sort();
        devices.dedup();
        assert_eq!(before, devices.len());

        let paths: Vec<_> = volumes
            .iter()
            .map(|volume| volume.mount_path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, vec!["/", "/media/usb0", "/storage/emulated"]);
    }

    #[test]
    fn excludes_small_read_only_and_quirky_mounts() {
        let volumes = scan();
        assert!(volumes.iter().all(|volume| volume.total_bytes >= Some(5_000_000)));
        assert!(!volumes.iter().any(|volume| volume.device == "/dev/sdc1"));
        assert!(!volumes.iter().any(|volume| volume.device == "/dev/sdd1"));
        assert!(!volumes.iter().any(|volume| volume.device == "/dev/sde1"));
    }

    #[test]
    fn flags_follow_heuristics() {
        let volumes = scan();
        let root = &volumes[0];
        assert!(root.is_primary());
        assert!(!root.is_removable());
        assert_eq!(root.description, "Internal storage");

        let usb = &volumes[1];
        assert!(usb.is_removable());
        assert_eq!(usb.description, "USB storage");

        assert!(volumes[2].is_emulated());
    }

    #[test]
    fn unsized_mounts_are_dropped() {
        let mounts = parse_mounts(TABLE).expect("parse");
        let volumes = scan_mount_points(&mounts, &config(), |_| None);
        assert!(volumes.is_empty());
    }

    #[test]
    fn threshold_is_configurable() {
        let mounts = parse_mounts(TABLE).expect("parse");
        let config = DiscoveryConfig {
            min_size_bytes: 1_000,
            ..config()
        };
        let volumes = scan_mount_points(&mounts, &config, sizes);
        assert!(volumes.iter().any(|volume| volume.device == "/dev/sde1"));
    }
}
