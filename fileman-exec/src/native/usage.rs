// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use fileman_sys::classify_path;
use fileman_types::{DiskUsage, FolderUsage};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::{ExecError, Result};
use crate::executable::check_cancelled;

pub(crate) fn disk_usage(path: &Path) -> Result<DiskUsage> {
    let canonical = fs::canonicalize(path).map_err(|e| ExecError::from_io(e, path))?;
    let stats = fileman_sys::filesystem_stats(&canonical)?;

    let mount_point = match fileman_sys::mounts::mount_point_for(&canonical) {
        Ok(Some(mount)) => mount.mount_path,
        Ok(None) => canonical,
        Err(error) => {
            tracing::warn!("mount table unavailable: {error}");
            canonical
        }
    };

    Ok(DiskUsage {
        mount_point,
        total: stats.total_bytes,
        used: stats.used_bytes(),
        free: stats.available_bytes,
    })
}

/// Sum everything below `dir`, one rayon task per top-level entry.
///
/// Unreadable subdirectories are skipped; symbolic links are counted, not
/// followed.
pub(crate) fn folder_usage(dir: &Path, cancel: &CancellationToken) -> Result<FolderUsage> {
    let metadata = fs::symlink_metadata(dir).map_err(|e| ExecError::from_io(e, dir))?;
    if !metadata.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ExecError::from_io(e, dir))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();

    let partials: Vec<FolderUsage> = entries
        .par_iter()
        .map(|entry| scan_entry(entry, cancel))
        .collect::<Result<_>>()?;

    let mut usage = FolderUsage::new(dir.to_path_buf());
    for partial in partials {
        usage.merge(partial);
    }

    tracing::debug!(
        "{}: {} files, {} directories, {} bytes",
        dir.display(),
        usage.files,
        usage.directories,
        usage.total_bytes
    );
    Ok(usage)
}

fn scan_entry(root: &Path, cancel: &CancellationToken) -> Result<FolderUsage> {
    let mut usage = FolderUsage::default();
    let mut stack = vec![root.to_path_buf()];

    while let Some(path) = stack.pop() {
        check_cancelled(cancel)?;

        let Ok(metadata) = fs::symlink_metadata(&path) else {
            continue;
        };

        if !metadata.is_dir() {
            usage.add_file(classify_path(&path), metadata.len());
            continue;
        }

        usage.add_directory();
        let Ok(children) = fs::read_dir(&path) else {
            tracing::debug!("skipping unreadable directory {}", path.display());
            continue;
        };
        stack.extend(children.filter_map(|child| child.ok().map(|child| child.path())));
    }

    Ok(usage)
}

#[cfg(test)]
mod tests {
    use fileman_types::MimeCategory;

    use super::*;

    #[test]
    fn counts_files_directories_and_categories() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("music/live")).unwrap();
        fs::write(dir.path().join("music/live/set.flac"), vec![0u8; 300]).unwrap();
        fs::write(dir.path().join("notes.txt"), vec![0u8; 20]).unwrap();
        fs::write(dir.path().join("blob"), vec![0u8; 7]).unwrap();

        let usage = folder_usage(dir.path(), &CancellationToken::new()).expect("usage");
        assert_eq!(usage.folder, dir.path());
        assert_eq!(usage.files, 3);
        assert_eq!(usage.directories, 2);
        assert_eq!(usage.bytes_for(MimeCategory::Audio), 300);
        assert_eq!(usage.bytes_for(MimeCategory::Documents), 20);
        assert_eq!(usage.bytes_for(MimeCategory::Other), 7);
        assert_eq!(usage.total_bytes, 327);
    }

    #[test]
    fn files_are_not_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();
        assert!(matches!(
            folder_usage(&file, &CancellationToken::new()),
            Err(ExecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn disk_usage_of_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let usage = disk_usage(dir.path()).expect("disk usage");
        assert!(usage.total >= usage.free);
        assert!(dir.path().canonicalize().unwrap().starts_with(&usage.mount_point));
    }
}
