// SPDX-License-Identifier: GPL-3.0-only

//! Storage volume discovery
//!
//! The platform volume list (`lsblk`) is asked first. Any failure there, or
//! an empty answer, falls back to a heuristic scan of the mount table. Both
//! paths apply the same filters, so the invariants hold either way:
//! at most one volume per backing device, nothing below the minimum size,
//! nothing read-only, nothing carrying a quirk marker.

pub mod cache;
pub mod heuristics;
pub mod lsblk;

use std::path::{Path, PathBuf};

use fileman_types::{StorageVolume, VolumeFlag};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::mounts::read_mount_points;
use crate::statfs::filesystem_stats;

pub use cache::{VolumeCache, init_shared_cache, shared_cache};

/// Volumes smaller than this are never reported.
pub const DEFAULT_MIN_VOLUME_BYTES: u64 = 5_000_000;

const DEFAULT_PSEUDO_PREFIXES: &[&str] = &[
    "/proc",
    "/sys",
    "/dev",
    "/acct",
    "/run/user",
    "/run/lock",
    "/run/credentials",
    "/mnt/asec",
    "/mnt/obb",
    "/mnt/secure",
    "/snap",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Minimum capacity in bytes for a mount to count as a volume
    pub min_size_bytes: u64,

    /// Mounts whose options contain any of these markers are hidden
    pub quirk_markers: Vec<String>,

    /// Mount paths under these prefixes are pseudo filesystems
    pub pseudo_prefixes: Vec<String>,

    /// Ask `lsblk` before scanning the mount table
    pub use_platform_list: bool,

    /// Path whose volume is flagged primary; `$HOME` when unset
    pub primary_path: Option<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: DEFAULT_MIN_VOLUME_BYTES,
            quirk_markers: vec!["x-gvfs-hide".to_string()],
            pseudo_prefixes: DEFAULT_PSEUDO_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            use_platform_list: true,
            primary_path: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn is_pseudo_path(&self, path: &Path) -> bool {
        self.pseudo_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    pub fn has_quirk_marker(&self, options: &[String]) -> bool {
        options.iter().any(|option| {
            self.quirk_markers
                .iter()
                .any(|marker| option == marker || option.starts_with(&format!("{marker}=")))
        })
    }

    pub fn primary_path(&self) -> PathBuf {
        self.primary_path
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}

/// Discover storage volumes, preferring the platform list.
pub fn discover_volumes(config: &DiscoveryConfig) -> Result<Vec<StorageVolume>> {
    if config.use_platform_list {
        match lsblk::list_volumes(config) {
            Ok(volumes) if !volumes.is_empty() => {
                info!("Discovered {} volume(s) from lsblk", volumes.len());
                return Ok(volumes);
            }
            Ok(_) => warn!("lsblk reported no usable volumes, scanning mount table"),
            Err(error) => warn!("lsblk unavailable ({error}), scanning mount table"),
        }
    }

    let mounts = read_mount_points()?;
    let volumes = heuristics::scan_mount_points(&mounts, config, |path| {
        filesystem_stats(path).ok().map(|stats| stats.total_bytes)
    });

    info!("Discovered {} volume(s) from mount table", volumes.len());
    Ok(volumes)
}

/// Flag the volume holding `primary` (longest prefix) as primary.
pub(crate) fn mark_primary(volumes: &mut [StorageVolume], primary: &Path) {
    let best = volumes
        .iter()
        .enumerate()
        .filter(|(_, volume)| volume.contains(primary))
        .max_by_key(|(_, volume)| volume.mount_path.components().count())
        .map(|(index, _)| index);

    if let Some(index) = best {
        volumes[index].flags |= VolumeFlag::Primary;
    }
}

/// Human-readable description and removable guess from the mount path.
///
/// Only the last path component is inspected.
pub fn describe_mount_path(path: &Path) -> (&'static str, bool) {
    let last = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if last.contains("usb") {
        return ("USB storage", true);
    }

    let digit_suffix = last.chars().last().is_some_and(|c| c.is_ascii_digit());
    let numbered_card = last
        .strip_prefix("sdcard")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()));

    if last.contains("ext") || numbered_card || digit_suffix {
        return ("SD card", true);
    }

    ("Internal storage", false)
}
