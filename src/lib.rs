//! mp4read - H.264 sample extraction and keyframe seeking for MP4 files
//!
//! The reading engine lives in `mp4read-core` and `mp4read-container`. This
//! crate holds the configuration shared by the `mp4read` binary and its tests.

pub mod config;
