// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypeParseError;

/// Archive and stream compression formats.
///
/// Archive modes (`Tar*`, `Zip`) hold any number of files and directories;
/// stream modes (`Gzip`, `Bzip2`, `Xz`) wrap exactly one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Gzip,
    Bzip2,
    Xz,
    /// Extraction only.
    Zip,
}

impl CompressionMode {
    pub const ALL: [CompressionMode; 8] = [
        CompressionMode::Tar,
        CompressionMode::TarGz,
        CompressionMode::TarBz2,
        CompressionMode::TarXz,
        CompressionMode::Gzip,
        CompressionMode::Bzip2,
        CompressionMode::Xz,
        CompressionMode::Zip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionMode::Tar => "tar",
            CompressionMode::TarGz => "tar.gz",
            CompressionMode::TarBz2 => "tar.bz2",
            CompressionMode::TarXz => "tar.xz",
            CompressionMode::Gzip => "gz",
            CompressionMode::Bzip2 => "bz2",
            CompressionMode::Xz => "xz",
            CompressionMode::Zip => "zip",
        }
    }

    /// File extension (without the leading dot) produced by this mode.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn is_archive(self) -> bool {
        matches!(
            self,
            CompressionMode::Tar
                | CompressionMode::TarGz
                | CompressionMode::TarBz2
                | CompressionMode::TarXz
                | CompressionMode::Zip
        )
    }

    pub fn can_compress(self) -> bool {
        self != CompressionMode::Zip
    }

    /// Detect the mode from a file name, preferring the longest known suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();

        const SUFFIXES: &[(&str, CompressionMode)] = &[
            (".tar.gz", CompressionMode::TarGz),
            (".tgz", CompressionMode::TarGz),
            (".tar.bz2", CompressionMode::TarBz2),
            (".tbz2", CompressionMode::TarBz2),
            (".tbz", CompressionMode::TarBz2),
            (".tar.xz", CompressionMode::TarXz),
            (".txz", CompressionMode::TarXz),
            (".tar", CompressionMode::Tar),
            (".gz", CompressionMode::Gzip),
            (".bz2", CompressionMode::Bzip2),
            (".xz", CompressionMode::Xz),
            (".zip", CompressionMode::Zip),
        ];

        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix) && name.len() > suffix.len())
            .map(|(_, mode)| *mode)
    }

    /// Strip this mode's suffix from a file name, e.g. `photos.tar.gz` -> `photos`.
    pub fn strip_suffix(self, file_name: &str) -> String {
        let lower = file_name.to_ascii_lowercase();
        let candidates: &[&str] = match self {
            CompressionMode::Tar => &[".tar"],
            CompressionMode::TarGz => &[".tar.gz", ".tgz"],
            CompressionMode::TarBz2 => &[".tar.bz2", ".tbz2", ".tbz"],
            CompressionMode::TarXz => &[".tar.xz", ".txz"],
            CompressionMode::Gzip => &[".gz"],
            CompressionMode::Bzip2 => &[".bz2"],
            CompressionMode::Xz => &[".xz"],
            CompressionMode::Zip => &[".zip"],
        };

        candidates
            .iter()
            .find(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
            .map(|suffix| file_name[..file_name.len() - suffix.len()].to_string())
            .unwrap_or_else(|| file_name.to_string())
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionMode {
    type Err = TypeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_start_matches('.').to_ascii_lowercase();
        let normalized = match normalized.as_str() {
            "tgz" => "tar.gz",
            "tbz" | "tbz2" => "tar.bz2",
            "txz" => "tar.xz",
            "gzip" => "gz",
            "bzip2" => "bz2",
            other => other,
        };

        CompressionMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| TypeParseError::CompressionMode(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_longest_suffix_first() {
        assert_eq!(
            CompressionMode::from_path(Path::new("/tmp/a.tar.gz")),
            Some(CompressionMode::TarGz)
        );
        assert_eq!(
            CompressionMode::from_path(Path::new("notes.TXT.GZ")),
            Some(CompressionMode::Gzip)
        );
        assert_eq!(
            CompressionMode::from_path(Path::new("backup.tbz2")),
            Some(CompressionMode::TarBz2)
        );
        assert_eq!(CompressionMode::from_path(Path::new(".gz")), None);
        assert_eq!(CompressionMode::from_path(Path::new("readme")), None);
    }

    #[test]
    fn strips_suffix_preserving_case() {
        assert_eq!(CompressionMode::TarGz.strip_suffix("Photos.TGZ"), "Photos");
        assert_eq!(CompressionMode::Xz.strip_suffix("log.txt.xz"), "log.txt");
        assert_eq!(CompressionMode::Zip.strip_suffix("plain"), "plain");
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("tgz".parse(), Ok(CompressionMode::TarGz));
        assert_eq!("bzip2".parse(), Ok(CompressionMode::Bzip2));
        assert!("rar".parse::<CompressionMode>().is_err());
        assert!(!CompressionMode::Zip.can_compress());
        assert!(!CompressionMode::Gzip.is_archive());
    }
}
