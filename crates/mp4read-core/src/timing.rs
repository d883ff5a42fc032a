//! Start-time normalization and tick conversion.

use std::time::Duration;

use mp4read_container::Sample;

/// Convert a tick count to wall time. A zero timescale yields zero.
pub fn ticks_to_duration(ticks: u64, timescale: u32) -> Duration {
    if timescale == 0 {
        return Duration::ZERO;
    }
    let timescale = timescale as u64;
    let nanos = (ticks % timescale) as u128 * 1_000_000_000 / timescale as u128;
    Duration::new(ticks / timescale, nanos as u32)
}

/// Earliest composition time among the leading samples.
///
/// Samples are visited in decode order until the first one whose composition
/// offset is zero (that sample included). Returns 0 for an empty track.
/// Subtracting this value makes the first presented frame start at 0.
pub fn start_time_offset(samples: &[Sample]) -> i64 {
    let mut decode_time = 0i64;
    let mut earliest: Option<i64> = None;

    for sample in samples {
        let composition_time = decode_time + sample.composition_offset;
        earliest = Some(earliest.map_or(composition_time, |e| e.min(composition_time)));
        if sample.composition_offset == 0 {
            break;
        }
        decode_time += sample.time_delta as i64;
    }

    earliest.unwrap_or(0)
}
