// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Errors raised while parsing model values from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("unknown access mode: {0}")]
    AccessMode(String),

    #[error("unknown checksum algorithm: {0}")]
    ChecksumAlgorithm(String),

    #[error("unknown compression mode: {0}")]
    CompressionMode(String),
}
