// SPDX-License-Identifier: GPL-3.0-only

use std::io;
use std::path::{Path, PathBuf};

use fileman_sys::SysError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecErrorKind {
    CommandNotFound,
    NotImplemented,
    InsufficientPermissions,
    NoSuchFileOrDirectory,
    ReadOnlyFilesystem,
    AlreadyExists,
    InvalidArgument,
    ExecutionFailed,
    Cancelled,
    Io,
    Parse,
}

impl ExecErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::InsufficientPermissions => 403,
            Self::NoSuchFileOrDirectory => 404,
            Self::AlreadyExists => 409,
            Self::ReadOnlyFilesystem => 423,
            Self::Cancelled => 499,
            Self::Io | Self::Parse | Self::ExecutionFailed => 500,
            Self::NotImplemented => 501,
            Self::CommandNotFound => 503,
        }
    }
}

/// Errors surfaced by executables of either creator.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("operation not implemented by this console: {0}")]
    NotImplemented(&'static str),

    #[error("insufficient permissions: {}", .0.display())]
    InsufficientPermissions(PathBuf),

    #[error("no such file or directory: {}", .0.display())]
    NoSuchFileOrDirectory(PathBuf),

    #[error("read-only filesystem: {}", .0.display())]
    ReadOnlyFilesystem(PathBuf),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{command} failed with exit code {code:?}: {stderr}")]
    ExecutionFailed {
        command: &'static str,
        code: Option<i32>,
        stderr: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected output: {0}")]
    Parse(String),
}

impl ExecError {
    pub fn kind(&self) -> ExecErrorKind {
        match self {
            Self::CommandNotFound(_) => ExecErrorKind::CommandNotFound,
            Self::NotImplemented(_) => ExecErrorKind::NotImplemented,
            Self::InsufficientPermissions(_) => ExecErrorKind::InsufficientPermissions,
            Self::NoSuchFileOrDirectory(_) => ExecErrorKind::NoSuchFileOrDirectory,
            Self::ReadOnlyFilesystem(_) => ExecErrorKind::ReadOnlyFilesystem,
            Self::AlreadyExists(_) => ExecErrorKind::AlreadyExists,
            Self::InvalidArgument(_) => ExecErrorKind::InvalidArgument,
            Self::ExecutionFailed { .. } => ExecErrorKind::ExecutionFailed,
            Self::Cancelled => ExecErrorKind::Cancelled,
            Self::Io(_) => ExecErrorKind::Io,
            Self::Parse(_) => ExecErrorKind::Parse,
        }
    }

    /// The creator cannot perform this operation at all. Callers treat this
    /// as a capability answer, not as a transient failure.
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::CommandNotFound(_) | Self::NotImplemented(_))
    }

    /// The operation may succeed under an elevated access mode.
    pub fn needs_elevation(&self) -> bool {
        matches!(self, Self::InsufficientPermissions(_))
    }

    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(error: io::Error, path: &Path) -> Self {
        if error.raw_os_error() == Some(libc::EROFS) {
            return Self::ReadOnlyFilesystem(path.to_path_buf());
        }

        match error.kind() {
            // A path running through a regular file does not exist either.
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                Self::NoSuchFileOrDirectory(path.to_path_buf())
            }
            io::ErrorKind::PermissionDenied => Self::InsufficientPermissions(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_path_buf()),
            _ => Self::Io(error),
        }
    }
}

impl From<SysError> for ExecError {
    fn from(error: SysError) -> Self {
        match error {
            SysError::CommandNotFound(command) => Self::CommandNotFound(command),
            SysError::Io(error) => Self::Io(error),
            SysError::Errno(errno) => Self::Io(io::Error::from(errno)),
            SysError::InvalidMountLine(line) => Self::Parse(line),
            SysError::ToolOutput { tool, reason } => Self::Parse(format!("{tool}: {reason}")),
            SysError::OperationFailed(message) => Self::ExecutionFailed {
                command: "system",
                code: None,
                stderr: message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_io_errors() {
        let path = Path::new("/data/x");
        assert_eq!(
            ExecError::from_io(io::Error::from(io::ErrorKind::NotFound), path).kind(),
            ExecErrorKind::NoSuchFileOrDirectory
        );
        assert_eq!(
            ExecError::from_io(io::Error::from_raw_os_error(libc::ENOTDIR), path).kind(),
            ExecErrorKind::NoSuchFileOrDirectory
        );
        assert_eq!(
            ExecError::from_io(io::Error::from_raw_os_error(libc::EACCES), path).kind(),
            ExecErrorKind::InsufficientPermissions
        );
        assert_eq!(
            ExecError::from_io(io::Error::from_raw_os_error(libc::EROFS), path).kind(),
            ExecErrorKind::ReadOnlyFilesystem
        );
        assert_eq!(
            ExecError::from_io(io::Error::from_raw_os_error(libc::EIO), path).kind(),
            ExecErrorKind::Io
        );
    }

    #[test]
    fn capability_and_elevation_never_overlap() {
        let not_found = ExecError::CommandNotFound("chown".to_string());
        let denied = ExecError::InsufficientPermissions(PathBuf::from("/root"));
        assert!(not_found.is_capability() && !not_found.needs_elevation());
        assert!(denied.needs_elevation() && !denied.is_capability());
        assert_ne!(not_found.kind().code(), denied.kind().code());
    }
}
