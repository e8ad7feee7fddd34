// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem object model
//!
//! A `FileSystemObject` is one entry of a directory listing. Both creators
//! produce the same shape: the native creator from `lstat(2)`, the shell
//! creator from `find -printf` records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
}

impl FileKind {
    /// Map a `find -printf %y` type letter.
    pub fn from_type_char(value: char) -> Option<Self> {
        match value {
            'f' => Some(FileKind::File),
            'd' => Some(FileKind::Directory),
            'l' => Some(FileKind::Symlink),
            'b' => Some(FileKind::BlockDevice),
            'c' => Some(FileKind::CharDevice),
            'p' => Some(FileKind::Fifo),
            's' => Some(FileKind::Socket),
            _ => None,
        }
    }

    /// Leading character of an `ls -l` style permission string.
    pub fn type_char(self) -> char {
        match self {
            FileKind::File => '-',
            FileKind::Directory => 'd',
            FileKind::Symlink => 'l',
            FileKind::BlockDevice => 'b',
            FileKind::CharDevice => 'c',
            FileKind::Fifo => 'p',
            FileKind::Socket => 's',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemObject {
    /// File name (last path component)
    pub name: String,

    /// Directory containing this object
    pub parent: PathBuf,

    pub kind: FileKind,

    /// Size in bytes as reported by `lstat`
    pub size: u64,

    pub modified: DateTime<Utc>,

    /// Permission bits including setuid/setgid/sticky (`mode & 0o7777`)
    pub mode: u32,

    pub uid: u32,

    pub gid: u32,

    /// Target of a symbolic link, as stored in the link
    pub link_target: Option<PathBuf>,
}

impl FileSystemObject {
    pub fn full_path(&self) -> PathBuf {
        self.parent.join(&self.name)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Render `kind` and `mode` the way `ls -l` does, e.g. `drwxr-sr-t`.
    pub fn permissions_string(&self) -> String {
        let mut rendered = String::with_capacity(10);
        rendered.push(self.kind.type_char());

        let special = [
            (0o4000, 's', 'S'),
            (0o2000, 's', 'S'),
            (0o1000, 't', 'T'),
        ];

        for (index, shift) in [6u32, 3, 0].into_iter().enumerate() {
            let bits = (self.mode >> shift) & 0o7;
            rendered.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            rendered.push(if bits & 0o2 != 0 { 'w' } else { '-' });

            let (flag, set_exec, set_no_exec) = special[index];
            let exec = bits & 0o1 != 0;
            rendered.push(match (self.mode & flag != 0, exec) {
                (true, true) => set_exec,
                (true, false) => set_no_exec,
                (false, true) => 'x',
                (false, false) => '-',
            });
        }

        rendered
    }
}

/// Sort directories first, then by case-insensitive name.
pub fn sort_listing(objects: &mut [FileSystemObject]) {
    objects.sort_by(|left, right| {
        right
            .is_directory()
            .cmp(&left.is_directory())
            .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
            .then_with(|| left.name.cmp(&right.name))
    });
}

/// Name of the last component, falling back to the whole path for `/`.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
