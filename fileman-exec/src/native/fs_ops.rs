// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{self, Metadata, OpenOptions};
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, symlink};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fileman_types::{FileKind, FileSystemObject, display_name};
use nix::errno::Errno;
use nix::unistd::{AccessFlags, access};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::{ExecError, Result};
use crate::executable::check_cancelled;
use crate::paths::{parent_of, prepare_transfer};

pub(crate) fn object_from_path(path: &Path) -> Result<FileSystemObject> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ExecError::from_io(e, path))?;
    Ok(object_from_metadata(path, &metadata))
}

/// Build an object from `lstat` metadata of `path`.
pub(crate) fn object_from_metadata(path: &Path, metadata: &Metadata) -> FileSystemObject {
    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_block_device() {
        FileKind::BlockDevice
    } else if file_type.is_char_device() {
        FileKind::CharDevice
    } else if file_type.is_fifo() {
        FileKind::Fifo
    } else if file_type.is_socket() {
        FileKind::Socket
    } else {
        FileKind::File
    };

    let modified = DateTime::<Utc>::from_timestamp(metadata.mtime(), metadata.mtime_nsec() as u32)
        .unwrap_or_default();

    let link_target = if kind == FileKind::Symlink {
        fs::read_link(path).ok()
    } else {
        None
    };

    FileSystemObject {
        name: display_name(path),
        parent: parent_of(path),
        kind,
        size: metadata.len(),
        modified,
        mode: metadata.mode() & 0o7777,
        uid: metadata.uid(),
        gid: metadata.gid(),
        link_target,
    }
}

pub(crate) fn list(dir: &Path, cancel: &CancellationToken) -> Result<Vec<FileSystemObject>> {
    if !fs::metadata(dir).map_err(|e| ExecError::from_io(e, dir))?.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let entries = fs::read_dir(dir).map_err(|e| ExecError::from_io(e, dir))?;

    let mut objects = Vec::new();
    for entry in entries {
        check_cancelled(cancel)?;
        let entry = entry.map_err(|e| ExecError::from_io(e, dir))?;
        let path = entry.path();
        // Entries can vanish between readdir and lstat.
        match entry.metadata() {
            Ok(metadata) => objects.push(object_from_metadata(&path, &metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(ExecError::from_io(e, &path)),
        }
    }

    Ok(objects)
}

/// Fail unless the caller may create or remove entries in `dir`.
pub(crate) fn ensure_writable(dir: &Path) -> Result<()> {
    match access(dir, AccessFlags::W_OK) {
        Ok(()) => Ok(()),
        Err(Errno::EROFS) => Err(ExecError::ReadOnlyFilesystem(dir.to_path_buf())),
        Err(Errno::ENOENT | Errno::ENOTDIR) => {
            Err(ExecError::NoSuchFileOrDirectory(dir.to_path_buf()))
        }
        Err(Errno::EACCES | Errno::EPERM) => {
            Err(ExecError::InsufficientPermissions(dir.to_path_buf()))
        }
        Err(errno) => Err(ExecError::Io(io::Error::from(errno))),
    }
}

pub(crate) fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub(crate) fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir(path).map_err(|e| ExecError::from_io(e, path))
}

pub(crate) fn create_file(path: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
        .map_err(|e| ExecError::from_io(e, path))
}

pub(crate) fn delete_file(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ExecError::from_io(e, path))?;
    if metadata.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is a directory",
            path.display()
        )));
    }

    fs::remove_file(path).map_err(|e| ExecError::from_io(e, path))
}

pub(crate) fn delete_directory(path: &Path, cancel: &CancellationToken) -> Result<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| ExecError::from_io(e, path))?;
    if !metadata.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    ensure_writable(&parent_of(path))?;
    remove_tree(path, cancel)
}

fn remove_tree(path: &Path, cancel: &CancellationToken) -> Result<()> {
    for entry in WalkDir::new(path).contents_first(true) {
        check_cancelled(cancel)?;
        let entry = entry.map_err(walk_error)?;
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        result.map_err(|e| ExecError::from_io(e, entry.path()))?;
    }
    Ok(())
}

pub(crate) fn walk_error(error: walkdir::Error) -> ExecError {
    let path = error.path().map(Path::to_path_buf).unwrap_or_default();
    match error.into_io_error() {
        Some(io_error) => ExecError::from_io(io_error, &path),
        None => ExecError::InvalidArgument(format!(
            "filesystem loop detected at {}",
            path.display()
        )),
    }
}

/// Shared preconditions of copy and move; returns the resolved target.
fn transfer_target(source: &Path, destination: &Path) -> Result<PathBuf> {
    let target = prepare_transfer(source, destination)?;
    if exists(&target) {
        return Err(ExecError::AlreadyExists(target));
    }
    Ok(target)
}

pub(crate) fn copy(source: &Path, destination: &Path, cancel: &CancellationToken) -> Result<()> {
    let target = transfer_target(source, destination)?;
    ensure_writable(&parent_of(&target))?;
    copy_tree(source, &target, cancel)
}

fn copy_tree(source: &Path, target: &Path, cancel: &CancellationToken) -> Result<()> {
    for entry in WalkDir::new(source) {
        check_cancelled(cancel)?;
        let entry = entry.map_err(walk_error)?;
        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let destination = if relative.as_os_str().is_empty() {
            target.to_path_buf()
        } else {
            target.join(relative)
        };

        copy_entry(entry.path(), entry.file_type(), &destination)?;
    }
    Ok(())
}

fn copy_entry(path: &Path, file_type: fs::FileType, destination: &Path) -> Result<()> {
    if file_type.is_symlink() {
        let link_target = fs::read_link(path).map_err(|e| ExecError::from_io(e, path))?;
        symlink(&link_target, destination).map_err(|e| ExecError::from_io(e, destination))
    } else if file_type.is_dir() {
        fs::create_dir(destination).map_err(|e| ExecError::from_io(e, destination))?;
        let permissions = fs::metadata(path)
            .map_err(|e| ExecError::from_io(e, path))?
            .permissions();
        fs::set_permissions(destination, permissions)
            .map_err(|e| ExecError::from_io(e, destination))
    } else if file_type.is_file() {
        fs::copy(path, destination)
            .map(drop)
            .map_err(|e| ExecError::from_io(e, path))
    } else {
        tracing::warn!("skipping special file {}", path.display());
        Ok(())
    }
}

pub(crate) fn move_to(source: &Path, destination: &Path, cancel: &CancellationToken) -> Result<()> {
    let target = transfer_target(source, destination)?;
    ensure_writable(&parent_of(source))?;
    ensure_writable(&parent_of(&target))?;

    match fs::rename(source, &target) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            tracing::debug!(
                "{} and {} are on different filesystems, copying",
                source.display(),
                target.display()
            );
            copy_tree(source, &target, cancel)?;
            if fs::symlink_metadata(source).is_ok_and(|m| m.is_dir()) {
                remove_tree(source, cancel)
            } else {
                fs::remove_file(source).map_err(|e| ExecError::from_io(e, source))
            }
        }
        Err(e) => Err(ExecError::from_io(e, source)),
    }
}

pub(crate) fn link(target: &Path, link: &Path) -> Result<()> {
    symlink(target, link).map_err(|e| ExecError::from_io(e, link))
}

pub(crate) fn resolve_link(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| ExecError::from_io(e, path))
}

pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    if path.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is a directory",
            path.display()
        )));
    }
    fs::read(path).map_err(|e| ExecError::from_io(e, path))
}

pub(crate) fn write(path: &Path, data: &[u8]) -> Result<()> {
    if path.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is a directory",
            path.display()
        )));
    }
    fs::write(path, data).map_err(|e| ExecError::from_io(e, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_reports_kinds_and_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("music")).unwrap();
        symlink("notes.txt", dir.path().join("latest")).unwrap();

        let mut objects = list(dir.path(), &CancellationToken::new()).expect("list");
        objects.sort_by(|a, b| a.name.cmp(&b.name));

        let kinds: Vec<_> = objects.iter().map(|o| (o.name.as_str(), o.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("latest", FileKind::Symlink),
                ("music", FileKind::Directory),
                ("notes.txt", FileKind::File),
            ]
        );
        assert_eq!(objects[0].link_target, Some(PathBuf::from("notes.txt")));
        assert_eq!(objects[2].size, 5);
        assert_eq!(objects[2].parent, dir.path());
    }

    #[test]
    fn copy_tree_and_refuse_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("album");
        fs::create_dir_all(source.join("disc1")).unwrap();
        fs::write(source.join("disc1/track.ogg"), b"ogg").unwrap();
        let cancel = CancellationToken::new();

        copy(&source, &dir.path().join("backup"), &cancel).expect("copy");
        assert_eq!(
            fs::read(dir.path().join("backup/disc1/track.ogg")).unwrap(),
            b"ogg"
        );

        // backup is a directory now, so the target becomes backup/album
        copy(&source, &dir.path().join("backup"), &cancel).expect("copy into");
        assert!(dir.path().join("backup/album/disc1/track.ogg").exists());

        let error = copy(&source, &dir.path().join("backup"), &cancel).unwrap_err();
        assert!(matches!(error, ExecError::AlreadyExists(_)));
    }

    #[test]
    fn delete_checks_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();
        let cancel = CancellationToken::new();

        assert!(matches!(
            delete_directory(&file, &cancel),
            Err(ExecError::InvalidArgument(_))
        ));
        assert!(matches!(
            delete_file(dir.path()),
            Err(ExecError::InvalidArgument(_))
        ));
        delete_file(&file).expect("delete");
        assert!(matches!(
            delete_file(&file),
            Err(ExecError::NoSuchFileOrDirectory(_))
        ));
    }

    #[test]
    fn move_renames_and_removes_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("draft.txt");
        fs::write(&source, b"text").unwrap();
        let target = dir.path().join("final.txt");

        move_to(&source, &target, &CancellationToken::new()).expect("move");
        assert!(!exists(&source));
        assert_eq!(fs::read(&target).unwrap(), b"text");
    }

    #[test]
    fn cancelled_delete_stops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("a/b")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            delete_directory(&tree, &cancel),
            Err(ExecError::Cancelled)
        ));
        assert!(tree.join("a/b").exists());
    }
}
