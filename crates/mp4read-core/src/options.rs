//! Reader tuning knobs.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Default cap on a single sample's size (4 MiB).
pub const DEFAULT_MAX_SAMPLE_SIZE: usize = 4 * 1024 * 1024;

/// Default `BufReader` capacity for files opened by path.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Options controlling how a [`VideoReader`](crate::VideoReader) touches the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ReaderOptions {
    /// Samples declaring more bytes than this are refused instead of allocated.
    pub max_sample_size: usize,
    /// Buffer size used when the reader opens a file itself.
    pub read_buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_sample_size: DEFAULT_MAX_SAMPLE_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}
