// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use enumflags2::{BitFlags, bitflags};
use serde::{Deserialize, Serialize};

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeFlag {
    Removable,
    Emulated,
    Primary,
}

/// A mount point the file manager presents to users (internal storage, SD
/// card, USB drive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVolume {
    pub mount_path: PathBuf,

    /// Human-readable description (e.g. "Internal storage", "SD card")
    pub description: String,

    /// Backing device; at most one volume is reported per device
    pub device: String,

    pub fs_type: String,

    /// Capacity in bytes, when known
    pub total_bytes: Option<u64>,

    pub flags: BitFlags<VolumeFlag>,
}

impl StorageVolume {
    pub fn is_removable(&self) -> bool {
        self.flags.contains(VolumeFlag::Removable)
    }

    pub fn is_emulated(&self) -> bool {
        self.flags.contains(VolumeFlag::Emulated)
    }

    pub fn is_primary(&self) -> bool {
        self.flags.contains(VolumeFlag::Primary)
    }

    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.mount_path)
    }
}

/// Whether `path` lies inside any of `volumes` (the restricted "chrooted"
/// navigation mode only allows such paths).
pub fn is_inside_volume(path: &Path, volumes: &[StorageVolume]) -> bool {
    volumes.iter().any(|volume| volume.contains(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_containment() {
        let volume = StorageVolume {
            mount_path: PathBuf::from("/media/usb0"),
            description: "USB storage".to_string(),
            device: "/dev/sdb1".to_string(),
            fs_type: "vfat".to_string(),
            total_bytes: Some(8_000_000_000),
            flags: VolumeFlag::Removable.into(),
        };

        assert!(volume.is_removable());
        assert!(!volume.is_primary());
        assert!(is_inside_volume(
            Path::new("/media/usb0/DCIM"),
            std::slice::from_ref(&volume)
        ));
        assert!(!is_inside_volume(Path::new("/media/usb01"), &[volume]));
    }
}
