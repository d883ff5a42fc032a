//! Error types for mp4read-core.

use std::io;
use thiserror::Error;

/// Result type for mp4read-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mp4read-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Sequential reading reached the last sample. Not a failure.
    #[error("end of stream")]
    EndOfStream,

    /// No video track matches the request, or the file has none.
    #[error("video track not found: {}", describe_track(.0))]
    TrackNotFound(Option<u32>),

    /// The selected track has no avcC box.
    #[error("avcC not found for track {0}")]
    ConfigurationMissing(u32),

    /// A sample is larger than the configured read limit.
    #[error("sample size capacity over: {size} > max_sample_size ({limit})")]
    CapacityExceeded { size: u32, limit: usize },

    /// Seek target lies beyond the last sample.
    #[error("seek target out of range: {0}")]
    OutOfRange(i64),

    /// Reads and seeks need `initialize()` first.
    #[error("track {0} is not initialized")]
    NotInitialized(u32),

    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Box structure could not be read.
    #[error(transparent)]
    Container(#[from] mp4read_container::Error),
}

impl Error {
    /// Whether this is the end-of-stream sentinel.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

fn describe_track(id: &Option<u32>) -> String {
    match id {
        Some(id) => format!("#{}", id),
        None => "no video track".to_string(),
    }
}
