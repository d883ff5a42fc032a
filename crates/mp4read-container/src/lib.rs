//! mp4read-container: the MP4 side of mp4read.
//!
//! Reads the box structure of a (non-fragmented) MP4 file and hands the
//! sample engine everything it needs without decoding any video:
//!
//! - [`probe`] - per-track chunk and sample tables plus AVC parameters
//! - [`extract_boxes`] - decoded payloads for selected box paths
//! - [`find_idr_frames`] - keyframe discovery for files without `stss`
//! - [`NalUnits`] - iteration over length-prefixed NAL units
//!
//! # Modules
//!
//! - `atoms` - box header parsing and primitive readers
//! - `boxes` - typed decoders for tkhd, mdhd, stts, ctts, stsc, stsz, ...
//! - `sample_table` - chunk/sample table resolution
//! - `avcc` - AVCDecoderConfigurationRecord

pub mod atoms;
pub mod avcc;
pub mod boxes;
pub mod error;
pub mod extract;
pub mod idr;
pub mod nal;
pub mod probe;
pub mod sample_table;

#[cfg(any(test, feature = "test-util"))]
pub mod fixture;

pub use atoms::BoxType;
pub use avcc::AvcDecoderConfiguration;
pub use error::{Error, Result};
pub use extract::{extract_boxes, BoxPath, BoxPayload, ExtractedBox};
pub use idr::find_idr_frames;
pub use nal::NalUnits;
pub use probe::{probe, AvcParams, ContainerInfo, HandlerType, TrackSummary};
pub use sample_table::{Chunk, Sample};
