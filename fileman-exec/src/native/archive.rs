// SPDX-License-Identifier: GPL-3.0-only

//! Archive creation and extraction with the tar, flate2, bzip2, xz2 and zip
//! crates.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fileman_types::CompressionMode;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use super::fs_ops::{ensure_writable, exists, walk_error};
use crate::error::{ExecError, Result};
use crate::executable::check_cancelled;
use crate::paths::{check_compress_sources, default_archive_path, default_extract_path, parent_of};

const CHUNK_SIZE: usize = 64 * 1024;
const COMPRESSION_LEVEL: u32 = 6;

pub(crate) fn compress(
    mode: CompressionMode,
    sources: &[PathBuf],
    output: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    check_compress_sources(mode, sources)?;
    let output = match output {
        Some(output) => output.to_path_buf(),
        None => default_archive_path(mode, sources)?,
    };

    for source in sources {
        let metadata = fs::symlink_metadata(source).map_err(|e| ExecError::from_io(e, source))?;
        if !mode.is_archive() && metadata.is_dir() {
            return Err(ExecError::InvalidArgument(format!(
                "{mode} cannot compress directory {}",
                source.display()
            )));
        }
    }
    if exists(&output) {
        return Err(ExecError::AlreadyExists(output));
    }
    ensure_writable(&parent_of(&output))?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&output)
        .map_err(|e| ExecError::from_io(e, &output))?;

    let written = write_archive(mode, file, sources, cancel);
    if let Err(error) = written {
        tracing::debug!("removing incomplete archive {}", output.display());
        let _ = fs::remove_file(&output);
        return Err(error);
    }

    tracing::info!("compressed {} source(s) into {}", sources.len(), output.display());
    Ok(output)
}

fn write_archive(
    mode: CompressionMode,
    file: File,
    sources: &[PathBuf],
    cancel: &CancellationToken,
) -> Result<()> {
    let level = COMPRESSION_LEVEL;
    match mode {
        CompressionMode::Tar => {
            build_tar(file, sources, cancel)?;
        }
        CompressionMode::TarGz => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::new(level));
            build_tar(encoder, sources, cancel)?.finish()?;
        }
        CompressionMode::TarBz2 => {
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::new(level));
            build_tar(encoder, sources, cancel)?.finish()?;
        }
        CompressionMode::TarXz => {
            let encoder = xz2::write::XzEncoder::new(file, level);
            build_tar(encoder, sources, cancel)?.finish()?;
        }
        CompressionMode::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::new(level));
            copy_stream(&sources[0], &mut encoder, cancel)?;
            encoder.finish()?;
        }
        CompressionMode::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::new(level));
            copy_stream(&sources[0], &mut encoder, cancel)?;
            encoder.finish()?;
        }
        CompressionMode::Xz => {
            let mut encoder = xz2::write::XzEncoder::new(file, level);
            copy_stream(&sources[0], &mut encoder, cancel)?;
            encoder.finish()?;
        }
        CompressionMode::Zip => return Err(ExecError::NotImplemented("compress zip")),
    }
    Ok(())
}

/// Append every source under its own name; returns the inner writer.
fn build_tar<W: Write>(writer: W, sources: &[PathBuf], cancel: &CancellationToken) -> Result<W> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);

    for source in sources {
        let base = parent_of(source);
        for entry in WalkDir::new(source) {
            check_cancelled(cancel)?;
            let entry = entry.map_err(walk_error)?;
            let name = entry.path().strip_prefix(&base).unwrap_or(entry.path());
            builder
                .append_path_with_name(entry.path(), name)
                .map_err(|e| ExecError::from_io(e, entry.path()))?;
        }
    }

    Ok(builder.into_inner()?)
}

fn copy_stream<W: Write>(source: &Path, writer: &mut W, cancel: &CancellationToken) -> Result<()> {
    let mut reader = File::open(source).map_err(|e| ExecError::from_io(e, source))?;
    copy_with_cancel(&mut reader, writer, cancel)
}

fn copy_with_cancel<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        check_cancelled(cancel)?;
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            return Ok(());
        }
        writer.write_all(&buffer[..read])?;
    }
}

pub(crate) fn uncompress(
    archive: &Path,
    destination: Option<&Path>,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let mode = CompressionMode::from_path(archive).ok_or_else(|| {
        ExecError::InvalidArgument(format!("unrecognized archive format: {}", archive.display()))
    })?;

    let metadata = fs::metadata(archive).map_err(|e| ExecError::from_io(e, archive))?;
    if metadata.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is a directory",
            archive.display()
        )));
    }

    let destination = match destination {
        Some(destination) => destination.to_path_buf(),
        None => default_extract_path(mode, archive)?,
    };
    check_extract_target(mode, &destination)?;

    let file = File::open(archive).map_err(|e| ExecError::from_io(e, archive))?;

    if mode.is_archive() {
        fs::create_dir_all(&destination).map_err(|e| ExecError::from_io(e, &destination))?;
        match mode {
            CompressionMode::Zip => unpack_zip(file, &destination, cancel)?,
            CompressionMode::TarGz => {
                unpack_tar(flate2::read::GzDecoder::new(file), &destination, cancel)?
            }
            CompressionMode::TarBz2 => {
                unpack_tar(bzip2::read::BzDecoder::new(file), &destination, cancel)?
            }
            CompressionMode::TarXz => {
                unpack_tar(xz2::read::XzDecoder::new(file), &destination, cancel)?
            }
            _ => unpack_tar(file, &destination, cancel)?,
        }
    } else {
        let mut reader: Box<dyn Read> = match mode {
            CompressionMode::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
            CompressionMode::Bzip2 => Box::new(bzip2::read::BzDecoder::new(file)),
            _ => Box::new(xz2::read::XzDecoder::new(file)),
        };
        let mut output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .map_err(|e| ExecError::from_io(e, &destination))?;

        if let Err(error) = copy_with_cancel(&mut reader, &mut output, cancel) {
            let _ = fs::remove_file(&destination);
            return Err(error);
        }
    }

    tracing::info!("extracted {} into {}", archive.display(), destination.display());
    Ok(destination)
}

/// Archives extract into a new or existing directory; streams never replace
/// an existing file.
pub(crate) fn check_extract_target(mode: CompressionMode, destination: &Path) -> Result<()> {
    if mode.is_archive() {
        match fs::symlink_metadata(destination) {
            Ok(metadata) if !metadata.is_dir() => {
                Err(ExecError::AlreadyExists(destination.to_path_buf()))
            }
            Ok(_) => ensure_writable(destination),
            Err(_) => ensure_writable(&parent_of(destination)),
        }
    } else if exists(destination) {
        Err(ExecError::AlreadyExists(destination.to_path_buf()))
    } else {
        ensure_writable(&parent_of(destination))
    }
}

fn unpack_tar<R: Read>(reader: R, destination: &Path, cancel: &CancellationToken) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        check_cancelled(cancel)?;
        let mut entry = entry?;
        // unpack_in refuses entries that would land outside `destination`
        if !entry.unpack_in(destination)? {
            tracing::warn!(
                "skipped archive entry outside {}: {}",
                destination.display(),
                entry.path()?.display()
            );
        }
    }
    Ok(())
}

fn unpack_zip(file: File, destination: &Path, cancel: &CancellationToken) -> Result<()> {
    let mut archive = zip::ZipArchive::new(file).map_err(zip_error)?;

    for index in 0..archive.len() {
        check_cancelled(cancel)?;
        let mut entry = archive.by_index(index).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("skipped unsafe zip entry {}", entry.name());
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ExecError::from_io(e, &target))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecError::from_io(e, parent))?;
        }
        let mut output = File::create(&target).map_err(|e| ExecError::from_io(e, &target))?;
        io::copy(&mut entry, &mut output).map_err(|e| ExecError::from_io(e, &target))?;

        if let Some(mode) = entry.unix_mode() {
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                .map_err(|e| ExecError::from_io(e, &target))?;
        }
    }
    Ok(())
}

fn zip_error(error: zip::result::ZipError) -> ExecError {
    match error {
        zip::result::ZipError::Io(error) => ExecError::Io(error),
        other => ExecError::Parse(format!("zip: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree(root: &Path) -> PathBuf {
        let photos = root.join("photos");
        fs::create_dir_all(photos.join("2024")).unwrap();
        fs::write(photos.join("2024/beach.jpg"), b"jpeg bytes").unwrap();
        fs::write(photos.join("index.txt"), b"beach").unwrap();
        photos
    }

    #[test]
    fn tar_modes_extract_what_they_pack() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photos = sample_tree(dir.path());
        let cancel = CancellationToken::new();

        for mode in [
            CompressionMode::Tar,
            CompressionMode::TarGz,
            CompressionMode::TarBz2,
            CompressionMode::TarXz,
        ] {
            let archive = compress(mode, &[photos.clone()], None, &cancel).expect("compress");
            assert_eq!(archive, dir.path().join(format!("photos.{}", mode.extension())));

            let target = dir.path().join(format!("out-{}", mode.as_str()));
            let extracted = uncompress(&archive, Some(&target), &cancel).expect("extract");
            assert_eq!(
                fs::read(extracted.join("photos/2024/beach.jpg")).unwrap(),
                b"jpeg bytes"
            );
        }
    }

    #[test]
    fn stream_modes_keep_one_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("server.log");
        fs::write(&log, b"line\n".repeat(100)).unwrap();
        let cancel = CancellationToken::new();

        let archive = compress(CompressionMode::Xz, &[log.clone()], None, &cancel).unwrap();
        let error = uncompress(&archive, None, &cancel).unwrap_err();
        assert!(matches!(error, ExecError::AlreadyExists(_)));

        fs::remove_file(&log).unwrap();
        let restored = uncompress(&archive, None, &cancel).unwrap();
        assert_eq!(restored, log);
        assert_eq!(fs::read(&log).unwrap().len(), 500);
    }

    #[test]
    fn never_overwrites_an_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photos = sample_tree(dir.path());
        let output = dir.path().join("taken.tar");
        fs::write(&output, b"keep").unwrap();

        let error = compress(
            CompressionMode::Tar,
            &[photos],
            Some(&output),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(error, ExecError::AlreadyExists(_)));
        assert_eq!(fs::read(&output).unwrap(), b"keep");
    }

    #[test]
    fn directories_cannot_be_streamed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photos = sample_tree(dir.path());
        let error = compress(
            CompressionMode::Gzip,
            &[photos],
            None,
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(error, ExecError::InvalidArgument(_)));
    }

    #[test]
    fn zip_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("docs.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.add_directory("docs/", options).unwrap();
            writer.start_file("docs/readme.md", options).unwrap();
            writer.write_all(b"# docs").unwrap();
            writer.finish().unwrap();
        }

        let extracted = uncompress(&archive, None, &CancellationToken::new()).unwrap();
        assert_eq!(extracted, dir.path().join("docs"));
        assert_eq!(fs::read(extracted.join("docs/readme.md")).unwrap(), b"# docs");
    }
}
