// SPDX-License-Identifier: GPL-3.0-only

//! Platform volume list through `lsblk --json`

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;

use enumflags2::BitFlags;
use fileman_types::{MountPoint, StorageVolume, VolumeFlag};
use serde::Deserialize;
use tracing::debug;

use super::heuristics::is_pseudo_fs_type;
use super::{DiscoveryConfig, describe_mount_path, mark_primary};
use crate::error::{Result, SysError};
use crate::mounts::read_mount_points;

const LSBLK_COLUMNS: &str = "PATH,MOUNTPOINT,FSTYPE,SIZE,RM,RO,HOTPLUG,TRAN";

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

/// util-linux prints booleans and sizes as strings in older releases.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Number(u64),
    Text(String),
}

impl Loose {
    fn as_bool(&self) -> bool {
        match self {
            Loose::Bool(value) => *value,
            Loose::Number(value) => *value != 0,
            Loose::Text(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        }
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Loose::Bool(_) => None,
            Loose::Number(value) => Some(*value),
            Loose::Text(value) => value.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    path: Option<String>,
    mountpoint: Option<String>,
    fstype: Option<String>,
    size: Option<Loose>,
    rm: Option<Loose>,
    ro: Option<Loose>,
    hotplug: Option<Loose>,
    tran: Option<String>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

/// One mounted block device, flattened out of the lsblk tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMount {
    pub device: String,
    pub mount_path: PathBuf,
    pub fs_type: String,
    pub size: Option<u64>,
    pub removable: bool,
    pub read_only: bool,
}

pub fn parse_lsblk_json(input: &str) -> Result<Vec<BlockMount>> {
    let output: LsblkOutput =
        serde_json::from_str(input).map_err(|error| SysError::ToolOutput {
            tool: "lsblk",
            reason: error.to_string(),
        })?;

    let mut mounts = Vec::new();
    for device in &output.blockdevices {
        flatten(device, false, &mut mounts);
    }

    Ok(mounts)
}

fn flatten(device: &LsblkDevice, parent_removable: bool, out: &mut Vec<BlockMount>) {
    let removable = parent_removable
        || device.rm.as_ref().is_some_and(Loose::as_bool)
        || device.hotplug.as_ref().is_some_and(Loose::as_bool)
        || device.tran.as_deref() == Some("usb");

    if let (Some(path), Some(mountpoint)) = (&device.path, &device.mountpoint)
        && !mountpoint.is_empty()
        && mountpoint != "[SWAP]"
    {
        out.push(BlockMount {
            device: path.clone(),
            mount_path: PathBuf::from(mountpoint),
            fs_type: device.fstype.clone().unwrap_or_default(),
            size: device.size.as_ref().and_then(Loose::as_u64),
            removable,
            read_only: device.ro.as_ref().is_some_and(Loose::as_bool),
        });
    }

    for child in &device.children {
        flatten(child, removable, out);
    }
}

/// Apply the discovery filters to lsblk mounts, using `mount_table` for
/// mount options (read-only state and quirk markers).
pub fn volumes_from_block_mounts(
    block_mounts: &[BlockMount],
    mount_table: &[MountPoint],
    config: &DiscoveryConfig,
) -> Vec<StorageVolume> {
    let mut seen_devices = HashSet::new();
    let mut volumes = Vec::new();

    for block in block_mounts {
        if config.is_pseudo_path(&block.mount_path) || is_pseudo_fs_type(&block.fs_type) {
            continue;
        }

        let entry = mount_table
            .iter()
            .find(|mount| mount.mount_path == block.mount_path);

        let read_only = block.read_only || entry.is_some_and(MountPoint::is_read_only);
        if read_only {
            continue;
        }

        if entry.is_some_and(|mount| config.has_quirk_marker(&mount.options)) {
            continue;
        }

        let Some(size) = block.size else {
            continue;
        };
        if size < config.min_size_bytes || seen_devices.contains(&block.device) {
            continue;
        }
        seen_devices.insert(block.device.clone());

        let (description, path_removable) = describe_mount_path(&block.mount_path);
        let removable = block.removable || path_removable;
        let description = if block.removable && description == "Internal storage" {
            "Removable storage"
        } else {
            description
        };

        let mut flags = BitFlags::empty();
        if removable {
            flags |= VolumeFlag::Removable;
        }

        volumes.push(StorageVolume {
            mount_path: block.mount_path.clone(),
            description: description.to_string(),
            device: block.device.clone(),
            fs_type: block.fs_type.clone(),
            total_bytes: Some(size),
            flags,
        });
    }

    mark_primary(&mut volumes, &config.primary_path());
    volumes
}

/// Ask lsblk for mounted block devices and filter them into volumes.
pub fn list_volumes(config: &DiscoveryConfig) -> Result<Vec<StorageVolume>> {
    if which::which("lsblk").is_err() {
        return Err(SysError::CommandNotFound("lsblk".to_string()));
    }

    let output = Command::new("lsblk")
        .args(["--json", "--bytes", "--paths", "--output", LSBLK_COLUMNS])
        .output()?;

    if !output.status.success() {
        return Err(SysError::OperationFailed(format!(
            "lsblk exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let block_mounts = parse_lsblk_json(&String::from_utf8_lossy(&output.stdout))?;
    debug!("lsblk reported {} mounted block device(s)", block_mounts.len());

    let mount_table = read_mount_points()?;
    Ok(volumes_from_block_mounts(&block_mounts, &mount_table, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mounts::parse_mounts;

    const LSBLK: &str = r#"{
   "blockdevices": [
      {"path":"/dev/nvme0n1", "mountpoint":null, "fstype":null, "size":512110190592, "rm":false, "ro":false, "hotplug":false, "tran":"nvme",
         "children": [
            {"path":"/dev/nvme0n1p1", "mountpoint":"/boot/efi", "fstype":"vfat", "size":4194304, "rm":false, "ro":false, "hotplug":false, "tran":null},
            {"path":"/dev/nvme0n1p2", "mountpoint":"/", "fstype":"ext4", "size":511000000000, "rm":false, "ro":false, "hotplug":false, "tran":null},
            {"path":"/dev/nvme0n1p3", "mountpoint":"[SWAP]", "fstype":"swap", "size":8000000000, "rm":false, "ro":false, "hotplug":false, "tran":null}
         ]
      },
      {"path":"/dev/sda", "mountpoint":null, "fstype":null, "size":"16008609792", "rm":"1", "ro":"0", "hotplug":"1", "tran":"usb",
         "children": [
            {"path":"/dev/sda1", "mountpoint":"/run/media/user/KEY", "fstype":"exfat", "size":"16007561216", "rm":"1", "ro":"0", "hotplug":"1", "tran":null}
         ]
      },
      {"path":"/dev/sr0", "mountpoint":"/run/media/user/DVD", "fstype":"iso9660", "size":4700000000, "rm":true, "ro":true, "hotplug":false, "tran":"sata"}
   ]
}"#;

    const TABLE: &str = "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
/dev/nvme0n1p1 /boot/efi vfat rw,relatime 0 0
/dev/sda1 /run/media/user/KEY exfat rw,nosuid,nodev 0 0
/dev/sr0 /run/media/user/DVD iso9660 ro,nosuid 0 0
";

    #[test]
    fn flattens_tree_and_skips_swap() {
        let mounts = parse_lsblk_json(LSBLK).expect("parse lsblk");
        let paths: Vec<_> = mounts.iter().map(|mount| mount.device.as_str()).collect();
        assert_eq!(paths, vec!["/dev/nvme0n1p1", "/dev/nvme0n1p2", "/dev/sda1", "/dev/sr0"]);
        assert!(mounts[2].removable);
        assert_eq!(mounts[2].size, Some(16_007_561_216));
        assert!(!mounts[1].removable);
    }

    #[test]
    fn filters_like_the_mount_scan() {
        let block_mounts = parse_lsblk_json(LSBLK).expect("parse lsblk");
        let table = parse_mounts(TABLE).expect("parse mounts");
        let config = DiscoveryConfig {
            primary_path: Some(PathBuf::from("/home/user")),
            ..DiscoveryConfig::default()
        };

        let volumes = volumes_from_block_mounts(&block_mounts, &table, &config);
        let paths: Vec<_> = volumes
            .iter()
            .map(|volume| volume.mount_path.to_string_lossy().into_owned())
            .collect();

        assert_eq!(paths, vec!["/", "/run/media/user/KEY"]);
        assert!(volumes[0].is_primary());
        assert!(volumes[1].is_removable());
        assert_eq!(volumes[1].description, "Removable storage");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_lsblk_json("not json").is_err());
    }
}
