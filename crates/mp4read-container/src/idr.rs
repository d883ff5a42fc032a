//! Full-stream IDR scan for tracks without a sync sample table.

use std::io::{Read, Seek, SeekFrom};

use crate::nal::{nal_unit_type, read_length_prefix, NAL_TYPE_IDR_SLICE};
use crate::probe::TrackSummary;
use crate::{Error, Result};

/// Find every sample that contains an IDR slice.
///
/// Walks the chunk table exactly like sequential reading does and, for each
/// non-empty sample, reads only the length prefix and header byte of each NAL
/// unit. Returns 0-based sample indices in ascending order.
pub fn find_idr_frames<R: Read + Seek>(
    reader: &mut R,
    track: &TrackSummary,
) -> Result<Vec<usize>> {
    let length_size = track
        .avc
        .and_then(|avc| avc.length_size)
        .ok_or_else(|| {
            Error::unsupported(format!("track {} has no AVC configuration", track.track_id))
        })? as usize;

    let mut indices = Vec::new();
    let mut header = vec![0u8; length_size + 1];
    let mut sample_index = 0usize;

    for chunk in &track.chunks {
        let end = sample_index + chunk.samples_per_chunk as usize;
        let mut data_offset = chunk.data_offset;

        while sample_index < end && sample_index < track.samples.len() {
            let size = track.samples[sample_index].size as u64;

            let mut nal_offset = 0u64;
            while nal_offset + header.len() as u64 <= size {
                reader.seek(SeekFrom::Start(data_offset + nal_offset))?;
                reader.read_exact(&mut header)?;

                if nal_unit_type(&header[length_size..]) == Some(NAL_TYPE_IDR_SLICE) {
                    indices.push(sample_index);
                    break;
                }
                let nal_len = read_length_prefix(&header[..length_size]) as u64;
                nal_offset += length_size as u64 + nal_len;
            }

            data_offset += size;
            sample_index += 1;
        }
    }

    tracing::debug!(
        "IDR scan of track {} found {} keyframes in {} samples",
        track.track_id,
        indices.len(),
        track.samples.len()
    );

    Ok(indices)
}
