//! Keyframe-aligned seeking.

use mp4read_container::TrackSummary;
use tracing::debug;

use crate::cursor::CursorState;
use crate::{Error, Result};

/// Sync sample numbers of a track, built on first use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyframeIndex {
    #[default]
    NotBuilt,
    /// Ascending 1-based sample numbers.
    Built(Vec<u32>),
}

impl KeyframeIndex {
    pub fn sample_numbers(&self) -> Option<&[u32]> {
        match self {
            Self::NotBuilt => None,
            Self::Built(numbers) => Some(numbers.as_slice()),
        }
    }

    /// Return the index, running `build` only if it does not exist yet.
    ///
    /// A failed build leaves the index unbuilt.
    pub fn get_or_build<F>(&mut self, build: F) -> Result<&[u32]>
    where
        F: FnOnce() -> Result<Vec<u32>>,
    {
        if let Self::NotBuilt = self {
            *self = Self::Built(build()?);
        }
        match self {
            Self::Built(numbers) => Ok(numbers.as_slice()),
            Self::NotBuilt => unreachable!("index was just built"),
        }
    }
}

/// Result of locating a seek target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The cursor already sits inside the target's GOP.
    Unchanged,
    /// Move the cursor to this keyframe.
    Moved(CursorState),
}

/// Find the keyframe a cursor must restart from to present `target`.
///
/// `target` is a normalized presentation time in track ticks. The walk
/// mirrors [`CursorState::advance`] and stops at the first non-empty sample
/// whose composition time exceeds the target. The last keyframe seen before
/// it becomes the new position; before any keyframe that is the start of the
/// stream. Unless `force` is set, a cursor already between that keyframe and
/// the matched sample is left alone.
pub fn locate_keyframe(
    track: &TrackSummary,
    keyframes: &[u32],
    target: i64,
    start_offset: i64,
    current: &CursorState,
    force: bool,
) -> Result<SeekOutcome> {
    let adjusted = target.saturating_add(start_offset);

    let mut sample_index = 0usize;
    let mut next_keyframe = 0usize;
    let mut decode_time = 0i64;
    let mut candidate = CursorState::default();

    for (chunk_index, chunk) in track.chunks.iter().enumerate() {
        let end = sample_index + chunk.samples_per_chunk as usize;
        let mut data_offset = chunk.data_offset;

        while sample_index < end && sample_index < track.samples.len() {
            let sample = &track.samples[sample_index];
            let number = sample_index as u64 + 1;

            let is_keyframe = keyframes
                .get(next_keyframe)
                .is_some_and(|&n| n as u64 == number);
            if is_keyframe {
                next_keyframe += 1;
            }

            if sample.size == 0 {
                decode_time += sample.time_delta as i64;
                sample_index += 1;
                continue;
            }

            if is_keyframe {
                candidate = CursorState {
                    chunk_index,
                    sample_index,
                    sample_end: Some(end),
                    decode_time,
                    data_offset,
                };
            }

            decode_time += sample.time_delta as i64;
            if adjusted < decode_time + sample.composition_offset {
                if !force
                    && candidate.sample_index <= current.sample_index
                    && current.sample_index <= sample_index + 1
                {
                    debug!(target, sample = sample_index, "Seek target inside current GOP");
                    return Ok(SeekOutcome::Unchanged);
                }
                debug!(
                    target,
                    sample = sample_index,
                    keyframe = candidate.sample_index,
                    "Seek moved cursor"
                );
                return Ok(SeekOutcome::Moved(candidate));
            }

            data_offset += sample.size as u64;
            sample_index += 1;
        }
    }

    Err(Error::OutOfRange(target))
}
