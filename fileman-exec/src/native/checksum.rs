// SPDX-License-Identifier: GPL-3.0-only

use std::fs::File;
use std::io::Read;
use std::path::Path;

use fileman_types::{Checksum, ChecksumAlgorithm};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::error::{ExecError, Result};
use crate::executable::check_cancelled;

const CHUNK_SIZE: usize = 64 * 1024;

pub(crate) fn checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
    cancel: &CancellationToken,
) -> Result<Checksum> {
    if path.is_dir() {
        return Err(ExecError::InvalidArgument(format!(
            "{} is a directory",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| ExecError::from_io(e, path))?;
    let hex = match algorithm {
        ChecksumAlgorithm::Md5 => digest::<Md5>(file, path, cancel)?,
        ChecksumAlgorithm::Sha1 => digest::<Sha1>(file, path, cancel)?,
        ChecksumAlgorithm::Sha256 => digest::<Sha256>(file, path, cancel)?,
    };

    Ok(Checksum::new(algorithm, hex))
}

fn digest<D: Digest>(mut file: File, path: &Path, cancel: &CancellationToken) -> Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        check_cancelled(cancel)?;
        let read = file
            .read(&mut buffer)
            .map_err(|e| ExecError::from_io(e, path))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        let cancel = CancellationToken::new();

        let md5 = checksum(&path, ChecksumAlgorithm::Md5, &cancel).unwrap();
        assert_eq!(md5.hex, "900150983cd24fb0d6963f7d28e17f72");

        let sha1 = checksum(&path, ChecksumAlgorithm::Sha1, &cancel).unwrap();
        assert_eq!(sha1.hex, "a9993e364706816aba3e25717850c26c9cd0d89d");

        let sha256 = checksum(&path, ChecksumAlgorithm::Sha256, &cancel).unwrap();
        assert_eq!(
            sha256.hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(sha256.is_well_formed());
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = checksum(dir.path(), ChecksumAlgorithm::Md5, &CancellationToken::new());
        assert!(matches!(error, Err(ExecError::InvalidArgument(_))));
    }
}
