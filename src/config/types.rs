use mp4read_core::options::{DEFAULT_MAX_SAMPLE_SIZE, DEFAULT_READ_BUFFER_SIZE};
use mp4read_core::ReaderOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub reader: ReaderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReaderConfig {
    /// Largest sample payload the reader will allocate, in bytes (default: 4 MiB)
    #[serde(default = "default_max_sample_size")]
    pub max_sample_size: usize,

    /// Buffer size for reading the input file (default: 4096)
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Video track to read when the command line does not name one
    #[serde(default)]
    pub track: Option<u32>,
}

fn default_max_sample_size() -> usize {
    DEFAULT_MAX_SAMPLE_SIZE
}

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_sample_size: default_max_sample_size(),
            read_buffer_size: default_read_buffer_size(),
            track: None,
        }
    }
}

impl ReaderConfig {
    pub fn options(&self) -> ReaderOptions {
        ReaderOptions {
            max_sample_size: self.max_sample_size,
            read_buffer_size: self.read_buffer_size,
        }
    }
}
