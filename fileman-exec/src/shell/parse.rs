// SPDX-License-Identifier: GPL-3.0-only

//! Parsers for the output of coreutils and findutils.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fileman_sys::classify_path;
use fileman_types::{
    Checksum, ChecksumAlgorithm, DiskUsage, FileKind, FileSystemObject, FolderUsage, Group,
    Identity,
};

use crate::error::{ExecError, Result};

const FIND_FIELDS: usize = 9;
const USAGE_FIELDS: usize = 3;

/// Split NUL-terminated output into records of `width` fields.
fn records(stdout: &[u8], width: usize) -> Result<Vec<Vec<&[u8]>>> {
    let mut fields: Vec<&[u8]> = stdout.split(|byte| *byte == 0).collect();
    // output ends with a terminator, leaving one empty trailing piece
    if fields.last().is_some_and(|field| field.is_empty()) {
        fields.pop();
    }

    if fields.len() % width != 0 {
        return Err(ExecError::Parse(format!(
            "expected records of {width} fields, got {} fields",
            fields.len()
        )));
    }

    Ok(fields.chunks(width).map(|chunk| chunk.to_vec()).collect())
}

fn text(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

fn number<T: std::str::FromStr>(field: &[u8], what: &str) -> Result<T> {
    let value = text(field);
    value
        .trim()
        .parse()
        .map_err(|_| ExecError::Parse(format!("invalid {what}: {value:?}")))
}

/// `%T@` is seconds since the epoch with a fractional part.
fn timestamp(field: &[u8]) -> Result<DateTime<Utc>> {
    let value = text(field);
    let (seconds, fraction) = value.split_once('.').unwrap_or((value.as_str(), ""));
    let seconds: i64 = seconds
        .parse()
        .map_err(|_| ExecError::Parse(format!("invalid timestamp: {value:?}")))?;

    let mut digits: String = fraction.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    let nanos: u32 = digits
        .parse()
        .map_err(|_| ExecError::Parse(format!("invalid timestamp: {value:?}")))?;

    DateTime::<Utc>::from_timestamp(seconds, nanos)
        .ok_or_else(|| ExecError::Parse(format!("timestamp out of range: {value:?}")))
}

/// Parse records printed with the `find -printf` object format.
pub(crate) fn parse_find_records(stdout: &[u8]) -> Result<Vec<FileSystemObject>> {
    records(stdout, FIND_FIELDS)?
        .into_iter()
        .map(|record| {
            let kind = text(record[2])
                .chars()
                .next()
                .and_then(FileKind::from_type_char)
                .unwrap_or(FileKind::File);
            let mode = u32::from_str_radix(text(record[5]).trim(), 8)
                .map_err(|_| ExecError::Parse(format!("invalid mode: {}", text(record[5]))))?;
            let link_target = (kind == FileKind::Symlink && !record[8].is_empty())
                .then(|| PathBuf::from(OsStr::from_bytes(record[8])));

            Ok(FileSystemObject {
                name: text(record[1]),
                parent: PathBuf::from(OsStr::from_bytes(record[0])),
                kind,
                size: number(record[3], "size")?,
                modified: timestamp(record[4])?,
                mode,
                uid: number(record[6], "uid")?,
                gid: number(record[7], "gid")?,
                link_target,
            })
        })
        .collect()
}

/// Parse records printed with the folder usage format.
pub(crate) fn parse_folder_usage(stdout: &[u8], folder: &Path) -> Result<FolderUsage> {
    let mut usage = FolderUsage::new(folder.to_path_buf());

    for record in records(stdout, USAGE_FIELDS)? {
        if record[0] == b"d" {
            usage.add_directory();
        } else {
            let name = OsStr::from_bytes(record[2]);
            usage.add_file(classify_path(Path::new(name)), number(record[1], "size")?);
        }
    }

    Ok(usage)
}

/// Parse `df -P -B1 <path>`.
pub(crate) fn parse_df(stdout: &str) -> Result<DiskUsage> {
    let line = stdout
        .lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| ExecError::Parse("df printed no filesystem".to_string()))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(ExecError::Parse(format!("unexpected df line: {line}")));
    }

    let field = |index: usize, what: &str| -> Result<u64> {
        fields[index]
            .parse()
            .map_err(|_| ExecError::Parse(format!("invalid {what} in df line: {line}")))
    };

    Ok(DiskUsage {
        // mount paths may contain spaces
        mount_point: PathBuf::from(fields[5..].join(" ")),
        total: field(1, "size")?,
        used: field(2, "used")?,
        free: field(3, "available")?,
    })
}

/// First word of `md5sum`-style output.
pub(crate) fn parse_checksum(stdout: &str, algorithm: ChecksumAlgorithm) -> Result<Checksum> {
    let hex = stdout
        .split_whitespace()
        .next()
        .ok_or_else(|| ExecError::Parse(format!("{algorithm} printed nothing")))?;

    let checksum = Checksum::new(algorithm, hex.trim_start_matches('\\'));
    if !checksum.is_well_formed() {
        return Err(ExecError::Parse(format!("malformed {algorithm} digest: {hex}")));
    }

    Ok(checksum)
}

/// Parse `id -u; id -g; id -G; id -un; id -Gn`.
///
/// Names are optional: `id -un` fails for uids without a passwd entry, which
/// leaves fewer lines.
fn labelled<'a>(lines: &[&'a str], label: &str) -> Option<&'a str> {
    lines
        .iter()
        .copied()
        .find_map(|line| line.strip_prefix(label))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) const IDENTITY_USER: &str = "user=";
pub(crate) const IDENTITY_GROUPS: &str = "groups=";

/// `id -u`, `id -g` and `id -G` lines, then optional `user=` and `groups=`
/// lines carrying the names.
pub(crate) fn parse_identity(stdout: &str) -> Result<Identity> {
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    if lines.len() < 3 {
        return Err(ExecError::Parse(format!("unexpected id output: {stdout:?}")));
    }

    let uid = number(lines[0].as_bytes(), "uid")?;
    let gid = number(lines[1].as_bytes(), "gid")?;
    let ids = lines[2]
        .split_whitespace()
        .map(|id| number::<u32>(id.as_bytes(), "gid"))
        .collect::<Result<Vec<_>>>()?;

    // Name lookups may fail independently; each is labelled.
    let user = labelled(&lines[3..], IDENTITY_USER).map(str::to_string);
    let names: Vec<&str> = labelled(&lines[3..], IDENTITY_GROUPS)
        .map(|names| names.split_whitespace().collect())
        .unwrap_or_default();

    let groups = ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| Group {
            id,
            name: (names.len() == lines[2].split_whitespace().count())
                .then(|| names[index].to_string()),
        })
        .collect();

    Ok(Identity {
        uid,
        user,
        gid,
        groups,
    })
}
