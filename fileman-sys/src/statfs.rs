// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use nix::sys::statvfs::{FsFlags, statvfs};

use crate::error::Result;

/// Byte-level capacity figures for the filesystem holding a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub total_bytes: u64,
    /// Free blocks, including those reserved for root
    pub free_bytes: u64,
    /// Free blocks available to unprivileged users
    pub available_bytes: u64,
    pub read_only: bool,
}

impl FsStats {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

pub fn filesystem_stats(path: &Path) -> Result<FsStats> {
    let stats = statvfs(path)?;
    let fragment = stats.fragment_size() as u64;

    Ok(FsStats {
        total_bytes: (stats.blocks() as u64).saturating_mul(fragment),
        free_bytes: (stats.blocks_free() as u64).saturating_mul(fragment),
        available_bytes: (stats.blocks_available() as u64).saturating_mul(fragment),
        read_only: stats.flags().contains(FsFlags::ST_RDONLY),
    })
}

/// Whether the filesystem holding `path` (or its nearest existing ancestor)
/// is mounted read-only. Unknown is reported as `false`.
pub fn is_read_only_filesystem(path: &Path) -> bool {
    path.ancestors()
        .find(|candidate| !candidate.as_os_str().is_empty() && candidate.exists())
        .and_then(|existing| filesystem_stats(existing).ok())
        .is_some_and(|stats| stats.read_only)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_filesystem_reports_capacity() {
        let stats = filesystem_stats(Path::new("/")).expect("statvfs on /");
        assert!(stats.total_bytes >= stats.free_bytes);
        assert!(stats.free_bytes >= stats.available_bytes);
        assert_eq!(stats.used_bytes(), stats.total_bytes - stats.free_bytes);
    }

    #[test]
    fn missing_leaf_falls_back_to_ancestor() {
        let proc_stats = filesystem_stats(Path::new("/proc")).expect("statvfs on /proc");
        assert_eq!(
            is_read_only_filesystem(Path::new("/proc/definitely/not/here")),
            proc_stats.read_only
        );
    }
}
