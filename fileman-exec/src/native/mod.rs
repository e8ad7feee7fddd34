// SPDX-License-Identifier: GPL-3.0-only

//! In-process creator
//!
//! Operations run through `std::fs` and the archive/digest crates in the
//! calling process, with the caller's own identity. Operations that need
//! privileges outside the caller's reach (ownership, permissions, signals,
//! identity switching, remounting, raw scripts) are not implemented here.

mod archive;
mod checksum;
mod fs_ops;
mod search;
mod usage;

use std::path::{Path, PathBuf};

use fileman_types::{
    Checksum, ChecksumAlgorithm, CompressionMode, DiskUsage, FileSystemObject, FolderUsage,
    MountPoint, Query, SearchResult,
};

use crate::error::Result;
use crate::executable::{Backend, BoxedExecutable, ExecutableCreator, Operation};

use fs_ops::object_from_path;
pub(crate) use search::check_search_args;

#[derive(Debug, Clone, Default)]
pub struct NativeCreator;

impl NativeCreator {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutableCreator for NativeCreator {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn list(&self, dir: &Path) -> Result<BoxedExecutable<Vec<FileSystemObject>>> {
        let dir = dir.to_path_buf();
        Ok(Operation::boxed("list", move |cancel| fs_ops::list(&dir, cancel)))
    }

    fn file_info(&self, path: &Path) -> Result<BoxedExecutable<FileSystemObject>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("file_info", move |_| object_from_path(&path)))
    }

    fn create_directory(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("create_directory", move |_| {
            fs_ops::create_directory(&path)
        }))
    }

    fn create_file(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("create_file", move |_| fs_ops::create_file(&path)))
    }

    fn delete_file(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("delete_file", move |_| fs_ops::delete_file(&path)))
    }

    fn delete_directory(&self, path: &Path) -> Result<BoxedExecutable<()>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("delete_directory", move |cancel| {
            fs_ops::delete_directory(&path, cancel)
        }))
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<BoxedExecutable<()>> {
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        Ok(Operation::boxed("copy", move |cancel| {
            fs_ops::copy(&source, &destination, cancel)
        }))
    }

    fn move_to(&self, source: &Path, destination: &Path) -> Result<BoxedExecutable<()>> {
        let (source, destination) = (source.to_path_buf(), destination.to_path_buf());
        Ok(Operation::boxed("move", move |cancel| {
            fs_ops::move_to(&source, &destination, cancel)
        }))
    }

    fn link(&self, target: &Path, link: &Path) -> Result<BoxedExecutable<()>> {
        let (target, link) = (target.to_path_buf(), link.to_path_buf());
        Ok(Operation::boxed("link", move |_| fs_ops::link(&target, &link)))
    }

    fn resolve_link(&self, path: &Path) -> Result<BoxedExecutable<PathBuf>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("resolve_link", move |_| {
            fs_ops::resolve_link(&path)
        }))
    }

    fn read(&self, path: &Path) -> Result<BoxedExecutable<Vec<u8>>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("read", move |_| fs_ops::read(&path)))
    }

    fn write(&self, path: &Path, data: Vec<u8>) -> Result<BoxedExecutable<()>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("write", move |_| fs_ops::write(&path, &data)))
    }

    fn checksum(
        &self,
        path: &Path,
        algorithm: ChecksumAlgorithm,
    ) -> Result<BoxedExecutable<Checksum>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("checksum", move |cancel| {
            checksum::checksum(&path, algorithm, cancel)
        }))
    }

    fn compress(
        &self,
        mode: CompressionMode,
        sources: &[PathBuf],
        output: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        let sources = sources.to_vec();
        let output = output.map(Path::to_path_buf);
        Ok(Operation::boxed("compress", move |cancel| {
            archive::compress(mode, &sources, output.as_deref(), cancel)
        }))
    }

    fn uncompress(
        &self,
        archive_path: &Path,
        destination: Option<&Path>,
    ) -> Result<BoxedExecutable<PathBuf>> {
        let archive_path = archive_path.to_path_buf();
        let destination = destination.map(Path::to_path_buf);
        Ok(Operation::boxed("uncompress", move |cancel| {
            archive::uncompress(&archive_path, destination.as_deref(), cancel)
        }))
    }

    fn disk_usage(&self, path: &Path) -> Result<BoxedExecutable<DiskUsage>> {
        let path = path.to_path_buf();
        Ok(Operation::boxed("disk_usage", move |_| usage::disk_usage(&path)))
    }

    fn folder_usage(&self, dir: &Path) -> Result<BoxedExecutable<FolderUsage>> {
        let dir = dir.to_path_buf();
        Ok(Operation::boxed("folder_usage", move |cancel| {
            usage::folder_usage(&dir, cancel)
        }))
    }

    fn mount_points(&self) -> Result<BoxedExecutable<Vec<MountPoint>>> {
        Ok(Operation::boxed("mount_points", |_| {
            Ok(fileman_sys::read_mount_points()?)
        }))
    }

    fn search(&self, dir: &Path, query: &Query) -> Result<BoxedExecutable<Vec<SearchResult>>> {
        let (dir, query) = (dir.to_path_buf(), query.clone());
        Ok(Operation::boxed("search", move |cancel| {
            search::search(&dir, &query, cancel)
        }))
    }
}
