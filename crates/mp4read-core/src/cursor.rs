//! Sequential sample cursor over the chunk table.

use mp4read_container::TrackSummary;
use tracing::trace;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Position of the cursor within a track.
///
/// `sample_end` is the exclusive sample index ending the current chunk; it
/// is `None` until the cursor enters its first chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorState {
    pub chunk_index: usize,
    pub sample_index: usize,
    pub sample_end: Option<usize>,
    /// Decode time of the sample at `sample_index`, in track ticks.
    pub decode_time: i64,
    /// File offset of the sample at `sample_index`.
    pub data_offset: u64,
}

/// Location and timing of one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SampleInfo {
    /// Absolute file offset of the payload.
    pub offset: u64,
    /// Payload size in bytes, never 0.
    pub size: u32,
    /// Byte width of each NAL length prefix.
    pub nal_length_size: u8,
    /// Decode duration in track ticks.
    pub time_delta: u32,
    /// 0-based index of the sample in decode order, counting empty samples.
    pub number: u64,
    /// Presentation time in track ticks, normalized to start at 0.
    pub composition_time: i64,
}

impl CursorState {
    /// Move to the next non-empty sample and describe it.
    ///
    /// Zero-sized samples are skipped but still advance decode time.
    /// Returns `None` once the chunk table is exhausted; further calls keep
    /// returning `None`.
    pub fn advance(&mut self, track: &TrackSummary, start_offset: i64) -> Option<SampleInfo> {
        let nal_length_size = track.avc.and_then(|avc| avc.length_size).unwrap_or(0);

        loop {
            let end = match self.sample_end {
                Some(end) => end,
                None => {
                    let chunk = track.chunks.get(self.chunk_index)?;
                    self.data_offset = chunk.data_offset;
                    let end = self.sample_index + chunk.samples_per_chunk as usize;
                    self.sample_end = Some(end);
                    end
                }
            };

            if self.sample_index >= end || self.sample_index >= track.samples.len() {
                if self.sample_index >= track.samples.len() {
                    return None;
                }
                self.chunk_index += 1;
                self.sample_end = None;
                continue;
            }

            let sample = &track.samples[self.sample_index];
            let number = self.sample_index as u64;
            self.sample_index += 1;

            if sample.size == 0 {
                trace!(number, "Skipping empty sample");
                self.decode_time += sample.time_delta as i64;
                continue;
            }

            let info = SampleInfo {
                offset: self.data_offset,
                size: sample.size,
                nal_length_size,
                time_delta: sample.time_delta,
                number,
                composition_time: self.decode_time + sample.composition_offset - start_offset,
            };
            self.data_offset += sample.size as u64;
            self.decode_time += sample.time_delta as i64;
            return Some(info);
        }
    }
}
