// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("System call failed: {0}")]
    Errno(#[from] nix::errno::Errno),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid mount table line: {0}")]
    InvalidMountLine(String),

    #[error("Failed to parse {tool} output: {reason}")]
    ToolOutput { tool: &'static str, reason: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;
