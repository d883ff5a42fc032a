//! Error types for mp4read-container.

use std::io;
use thiserror::Error;

use crate::atoms::BoxType;

/// Result type for mp4read-container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mp4read-container operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid MP4 file structure.
    #[error("Invalid MP4: {0}")]
    InvalidMp4(String),

    /// Missing required box in MP4 file.
    #[error("Missing required box: {0}")]
    MissingBox(&'static str),

    /// A box ended before all of its fields could be decoded.
    #[error("Truncated {0} box")]
    Truncated(BoxType),

    /// Box payload larger than the parser is willing to buffer.
    #[error("Box {box_type} data size {size} exceeds maximum {max}")]
    BoxTooLarge { box_type: BoxType, size: u64, max: u64 },

    /// Unsupported feature or codec.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create an invalid MP4 error.
    pub fn invalid_mp4(msg: impl Into<String>) -> Self {
        Self::InvalidMp4(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
