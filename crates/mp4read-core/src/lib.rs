//! mp4read-core: sequential reading and keyframe seeking over one H.264
//! track of an MP4 file.
//!
//! [`VideoReader`] ties the pieces together:
//!
//! - `track` - choose a video track by ID or take the first one
//! - `metadata` - sync samples and SPS/PPS of the selected track
//! - `timing` - start-time normalization for reordered streams
//! - `cursor` - walk samples in decode order, skipping empty ones
//! - `seek` - move the cursor to the keyframe preceding a timestamp
//! - `mdat` - bounded payload reads
//! - `annexb` - start-code output for raw elementary streams

pub mod annexb;
pub mod cursor;
pub mod error;
pub mod mdat;
pub mod metadata;
pub mod options;
pub mod reader;
pub mod seek;
pub mod timing;
pub mod track;

pub use cursor::{CursorState, SampleInfo};
pub use error::{Error, Result};
pub use metadata::TrackMetadata;
pub use options::ReaderOptions;
pub use reader::{Samples, VideoReader};
pub use seek::{KeyframeIndex, SeekOutcome};
pub use timing::start_time_offset;
pub use track::{TrackSelection, VideoInfo};
