// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Capacity of the filesystem holding a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub mount_point: PathBuf,
    pub total: u64,
    pub used: u64,
    /// Bytes available to unprivileged users
    pub free: u64,
}

impl DiskUsage {
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        (self.used as f64 * 100.0 / self.total as f64).clamp(0.0, 100.0)
    }
}

/// Coarse content categories used to break down folder usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MimeCategory {
    Documents,
    Images,
    Audio,
    Video,
    Archives,
    Code,
    Apps,
    Other,
}

impl MimeCategory {
    pub const ALL: [MimeCategory; 8] = [
        MimeCategory::Documents,
        MimeCategory::Images,
        MimeCategory::Audio,
        MimeCategory::Video,
        MimeCategory::Archives,
        MimeCategory::Code,
        MimeCategory::Apps,
        MimeCategory::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MimeCategory::Documents => "Documents",
            MimeCategory::Images => "Images",
            MimeCategory::Audio => "Audio",
            MimeCategory::Video => "Video",
            MimeCategory::Archives => "Archives",
            MimeCategory::Code => "Code",
            MimeCategory::Apps => "Apps",
            MimeCategory::Other => "Other",
        }
    }
}

/// Recursive content summary of one folder.
///
/// Directory entries are counted but contribute no bytes; every other entry
/// contributes its `lstat` size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderUsage {
    pub folder: PathBuf,
    pub files: u64,
    pub directories: u64,
    pub total_bytes: u64,
    pub bytes_by_category: BTreeMap<MimeCategory, u64>,
}

impl FolderUsage {
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            ..Self::default()
        }
    }

    pub fn add_file(&mut self, category: MimeCategory, bytes: u64) {
        self.files += 1;
        self.total_bytes += bytes;
        *self.bytes_by_category.entry(category).or_insert(0) += bytes;
    }

    pub fn add_directory(&mut self) {
        self.directories += 1;
    }

    pub fn merge(&mut self, other: FolderUsage) {
        self.files += other.files;
        self.directories += other.directories;
        self.total_bytes += other.total_bytes;

        for (category, bytes) in other.bytes_by_category {
            *self.bytes_by_category.entry(category).or_insert(0) += bytes;
        }
    }

    pub fn bytes_for(&self, category: MimeCategory) -> u64 {
        self.bytes_by_category.get(&category).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_counters_and_categories() {
        let mut left = FolderUsage::new(PathBuf::from("/data"));
        left.add_file(MimeCategory::Images, 100);
        left.add_directory();

        let mut right = FolderUsage::default();
        right.add_file(MimeCategory::Images, 50);
        right.add_file(MimeCategory::Audio, 7);

        left.merge(right);
        assert_eq!(left.files, 3);
        assert_eq!(left.directories, 1);
        assert_eq!(left.total_bytes, 157);
        assert_eq!(left.bytes_for(MimeCategory::Images), 150);
        assert_eq!(left.bytes_for(MimeCategory::Video), 0);
        assert_eq!(left.folder, PathBuf::from("/data"));
    }

    #[test]
    fn percent_handles_empty_filesystems() {
        let usage = DiskUsage {
            mount_point: PathBuf::from("/"),
            total: 0,
            used: 0,
            free: 0,
        };
        assert_eq!(usage.percent_used(), 0.0);
    }
}
