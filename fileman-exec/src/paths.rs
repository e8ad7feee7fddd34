// SPDX-License-Identifier: GPL-3.0-only

//! Destination resolution shared by both creators
//!
//! Native and shell executables resolve destinations with the same rules so
//! that they fail on the same preconditions.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use fileman_types::CompressionMode;

use crate::error::{ExecError, Result};

/// `destination` itself, or `destination/<source name>` when `destination`
/// is an existing directory.
pub fn resolve_destination(source: &Path, destination: &Path) -> Result<PathBuf> {
    if destination.is_dir() {
        let name = source.file_name().ok_or_else(|| {
            ExecError::InvalidArgument(format!("{} has no file name", source.display()))
        })?;
        return Ok(destination.join(name));
    }

    Ok(destination.to_path_buf())
}

/// Reject copying or moving a directory into itself.
pub fn ensure_not_nested(source: &Path, destination: &Path) -> Result<()> {
    let source = absolute(source);
    let destination = absolute(destination);

    if destination.starts_with(&source) {
        return Err(ExecError::InvalidArgument(format!(
            "cannot place {} inside itself",
            source.display()
        )));
    }

    Ok(())
}

/// Resolve and validate the target of a copy or move.
///
/// A missing source is reported before anything else; a source that cannot
/// be inspected is left for the executing backend to judge.
pub fn prepare_transfer(source: &Path, destination: &Path) -> Result<PathBuf> {
    if let Err(error) = fs::symlink_metadata(source)
        && matches!(
            error.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        )
    {
        return Err(ExecError::NoSuchFileOrDirectory(source.to_path_buf()));
    }

    let target = resolve_destination(source, destination)?;
    ensure_not_nested(source, &target)?;
    Ok(target)
}

/// Directory whose write permission governs creating `path`.
pub fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => PathBuf::from("/"),
    }
}

/// Symlinks followed when resolving one path.
const MAX_LINK_HOPS: usize = 40;

/// Absolute path with every symlink followed and `.`/`..` folded, whether or
/// not the final components exist (`realpath -m`).
pub fn real_path(path: &Path) -> Result<PathBuf> {
    let mut pending: VecDeque<OsString> = components(&std::path::absolute(path)?);
    let mut resolved = PathBuf::from("/");
    let mut hops = 0;

    while let Some(part) = pending.pop_front() {
        if part == ".." {
            resolved.pop();
            continue;
        }

        let candidate = resolved.join(&part);
        match fs::read_link(&candidate) {
            Ok(target) => {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(ExecError::InvalidArgument(format!(
                        "too many levels of symbolic links: {}",
                        path.display()
                    )));
                }
                if target.is_absolute() {
                    resolved = PathBuf::from("/");
                }
                for link_part in components(&target).into_iter().rev() {
                    pending.push_front(link_part);
                }
            }
            Err(_) => resolved = candidate,
        }
    }

    Ok(resolved)
}

/// Normal and `..` components of `path`; `.` and the root are dropped.
fn components(path: &Path) -> VecDeque<OsString> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_os_string()),
            Component::ParentDir => Some(OsString::from("..")),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Canonical path when the target exists, lexical absolute path otherwise.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let parent = parent_of(path);
    match (parent.canonicalize(), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// Default archive path for `sources`: next to the first source, named after
/// it (or "archive" when several sources are packed).
pub fn default_archive_path(mode: CompressionMode, sources: &[PathBuf]) -> Result<PathBuf> {
    let first = sources
        .first()
        .ok_or_else(|| ExecError::InvalidArgument("nothing to compress".to_string()))?;

    let name = first
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ExecError::InvalidArgument(format!("{} has no file name", first.display()))
        })?;

    let stem = if mode.is_archive() && sources.len() > 1 {
        "archive".to_string()
    } else {
        name
    };

    Ok(parent_of(first).join(format!("{stem}.{}", mode.extension())))
}

/// Default extraction target: a directory (archives) or file (streams) next
/// to `archive`, named after it without the compression suffix.
pub fn default_extract_path(mode: CompressionMode, archive: &Path) -> Result<PathBuf> {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            ExecError::InvalidArgument(format!("{} has no file name", archive.display()))
        })?;

    Ok(parent_of(archive).join(mode.strip_suffix(&name)))
}

/// Validate the source list of a compression request.
pub fn check_compress_sources(mode: CompressionMode, sources: &[PathBuf]) -> Result<()> {
    if !mode.can_compress() {
        return Err(ExecError::NotImplemented("compress zip"));
    }

    if sources.is_empty() {
        return Err(ExecError::InvalidArgument("nothing to compress".to_string()));
    }

    if !mode.is_archive() && sources.len() != 1 {
        return Err(ExecError::InvalidArgument(format!(
            "{mode} compresses exactly one file"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_destinations_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("photos");
        std::fs::create_dir(&source).expect("mkdir");

        assert!(ensure_not_nested(&source, &source.join("backup")).is_err());
        assert!(ensure_not_nested(&source, &source).is_err());
        assert!(ensure_not_nested(&source, &dir.path().join("photos-copy")).is_ok());
    }

    #[test]
    fn real_paths_fold_dots_and_follow_links() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonical tempdir");
        std::fs::create_dir(root.join("inside")).expect("mkdir");
        std::os::unix::fs::symlink("/etc", root.join("inside/escape")).expect("symlink");
        std::os::unix::fs::symlink("../inside", root.join("inside/loop")).expect("symlink");

        assert_eq!(
            real_path(&root.join("inside/../inside/./new/file")).unwrap(),
            root.join("inside/new/file")
        );
        assert_eq!(
            real_path(&root.join("inside/escape/fileman-none")).unwrap(),
            Path::new("/etc").canonicalize().unwrap().join("fileman-none")
        );
        assert_eq!(
            real_path(&root.join("inside/loop/loop/x")).unwrap(),
            root.join("inside/x")
        );
        assert_eq!(real_path(Path::new("/../..")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn sources_below_a_file_are_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").expect("seed");

        assert!(matches!(
            prepare_transfer(&file.join("child"), &dir.path().join("copy")),
            Err(ExecError::NoSuchFileOrDirectory(_))
        ));
    }

    #[test]
    fn destination_inside_existing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolved =
            resolve_destination(Path::new("/src/notes.txt"), dir.path()).expect("resolve");
        assert_eq!(resolved, dir.path().join("notes.txt"));

        let target = dir.path().join("renamed.txt");
        assert_eq!(
            resolve_destination(Path::new("/src/notes.txt"), &target).expect("resolve"),
            target
        );
    }

    #[test]
    fn default_names() {
        let single = vec![PathBuf::from("/data/photos")];
        assert_eq!(
            default_archive_path(CompressionMode::TarGz, &single).unwrap(),
            PathBuf::from("/data/photos.tar.gz")
        );

        let several = vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")];
        assert_eq!(
            default_archive_path(CompressionMode::Tar, &several).unwrap(),
            PathBuf::from("/data/archive.tar")
        );

        assert_eq!(
            default_extract_path(CompressionMode::Bzip2, Path::new("/data/log.txt.bz2")).unwrap(),
            PathBuf::from("/data/log.txt")
        );
        assert!(check_compress_sources(CompressionMode::Gzip, &several).is_err());
        assert!(check_compress_sources(CompressionMode::Zip, &single).is_err());
    }
}
