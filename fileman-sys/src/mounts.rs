// SPDX-License-Identifier: GPL-3.0-only

//! Mount table access
//!
//! The table is re-read on every call; nothing here caches mount state.

use std::fs;
use std::path::{Path, PathBuf};

use fileman_types::MountPoint;
use tracing::debug;

use crate::error::{Result, SysError};

pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Read and parse the current mount table.
pub fn read_mount_points() -> Result<Vec<MountPoint>> {
    let table = fs::read_to_string(PROC_MOUNTS)?;
    let mounts = parse_mounts(&table)?;
    debug!("Read {} mount entries from {}", mounts.len(), PROC_MOUNTS);
    Ok(mounts)
}

/// Mount entry holding `path`, resolved against a fresh read of the table.
pub fn mount_point_for(path: &Path) -> Result<Option<MountPoint>> {
    let mounts = read_mount_points()?;
    Ok(fileman_types::mount_point_for(&mounts, path).cloned())
}

/// Parse `/proc/mounts` (fstab format) text.
///
/// Each non-empty line is `device mount_path fs_type options dump pass`;
/// the trailing two numeric fields may be absent.
pub fn parse_mounts(input: &str) -> Result<Vec<MountPoint>> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_mount_line)
        .collect()
}

fn parse_mount_line(line: &str) -> Result<MountPoint> {
    let invalid = || SysError::InvalidMountLine(line.to_string());
    let mut fields = line.split_whitespace();

    let device = fields.next().ok_or_else(invalid)?;
    let mount_path = fields.next().ok_or_else(invalid)?;
    let fs_type = fields.next().ok_or_else(invalid)?;
    let options = fields.next().ok_or_else(invalid)?;

    let dump = match fields.next() {
        Some(value) => value.parse().map_err(|_| invalid())?,
        None => 0,
    };
    let pass = match fields.next() {
        Some(value) => value.parse().map_err(|_| invalid())?,
        None => 0,
    };

    Ok(MountPoint {
        device: unescape_mount_field(device),
        mount_path: PathBuf::from(unescape_mount_field(mount_path)),
        fs_type: fs_type.to_string(),
        options: options
            .split(',')
            .filter(|option| !option.is_empty())
            .map(ToString::to_string)
            .collect(),
        dump,
        pass,
    })
}

/// Decode the kernel's octal escapes (`\040` for space, `\011` for tab, ...).
fn unescape_mount_field(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 4 <= bytes.len()
            && bytes[index + 1..index + 4]
                .iter()
                .all(|digit| (b'0'..=b'7').contains(digit))
        {
            let octal = &value[index + 1..index + 4];
            if let Ok(num) = u8::from_str_radix(octal, 8) {
                output.push(num);
                index += 4;
                continue;
            }
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&output).into_owned()
}
