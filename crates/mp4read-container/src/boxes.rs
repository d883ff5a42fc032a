//! Typed decoders for the full boxes the prober and extractor care about.
//!
//! Every decoder takes the box content (without the 8/16 byte header) and maps
//! running out of bytes to [`Error::Truncated`](crate::Error::Truncated).

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::atoms::{
    read_children, read_fullbox_header, read_i32, read_u16, read_u32, read_u64,
    truncated_or_io, BoxType,
};
use crate::avcc::AvcDecoderConfiguration;
use crate::{Error, Result};

fn decode<T>(
    box_type: BoxType,
    data: &[u8],
    f: impl FnOnce(&mut Cursor<&[u8]>) -> io::Result<T>,
) -> Result<T> {
    let mut cursor = Cursor::new(data);
    f(&mut cursor).map_err(|e| truncated_or_io(box_type, e))
}

/// Upper bound for a table allocation: never trust `entry_count` beyond what
/// the box could actually hold.
fn table_capacity(entry_count: u32, data: &[u8], entry_size: usize) -> usize {
    (entry_count as usize).min(data.len() / entry_size)
}

/// Movie or media header: timescale and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaHeader {
    pub timescale: u32,
    pub duration: u64,
}

/// Decode `mvhd` or `mdhd`; both share the leading time fields.
pub fn decode_media_header(box_type: BoxType, data: &[u8]) -> Result<MediaHeader> {
    decode(box_type, data, |r| {
        let (version, _flags) = read_fullbox_header(r)?;
        if version == 1 {
            let _creation = read_u64(r)?;
            let _modification = read_u64(r)?;
            let timescale = read_u32(r)?;
            let duration = read_u64(r)?;
            Ok(MediaHeader { timescale, duration })
        } else {
            let _creation = read_u32(r)?;
            let _modification = read_u32(r)?;
            let timescale = read_u32(r)?;
            let duration = read_u32(r)? as u64;
            Ok(MediaHeader { timescale, duration })
        }
    })
}

/// Track header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeader {
    pub track_id: u32,
    /// Duration in movie timescale units.
    pub duration: u64,
    /// Presentation width (integer part of the 16.16 value).
    pub width: u32,
    /// Presentation height (integer part of the 16.16 value).
    pub height: u32,
}

/// Decode `tkhd`.
pub fn decode_tkhd(data: &[u8]) -> Result<TrackHeader> {
    decode(BoxType::TKHD, data, |r| {
        let (version, _flags) = read_fullbox_header(r)?;
        let (track_id, duration) = if version == 1 {
            let _creation = read_u64(r)?;
            let _modification = read_u64(r)?;
            let track_id = read_u32(r)?;
            let _reserved = read_u32(r)?;
            (track_id, read_u64(r)?)
        } else {
            let _creation = read_u32(r)?;
            let _modification = read_u32(r)?;
            let track_id = read_u32(r)?;
            let _reserved = read_u32(r)?;
            (track_id, read_u32(r)? as u64)
        };
        // reserved(8) + layer(2) + alt_group(2) + volume(2) + reserved(2) + matrix(36)
        let mut skip = [0u8; 52];
        r.read_exact(&mut skip)?;
        let width = read_u32(r)? >> 16;
        let height = read_u32(r)? >> 16;
        Ok(TrackHeader {
            track_id,
            duration,
            width,
            height,
        })
    })
}

/// Decode `hdlr`, returning the handler type code.
pub fn decode_hdlr(data: &[u8]) -> Result<[u8; 4]> {
    decode(BoxType::HDLR, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let _pre_defined = read_u32(r)?;
        let mut handler = [0u8; 4];
        r.read_exact(&mut handler)?;
        Ok(handler)
    })
}

/// Decode `stts` into (sample_count, sample_delta) runs.
pub fn decode_stts(data: &[u8]) -> Result<Vec<(u32, u32)>> {
    decode(BoxType::STTS, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let entry_count = read_u32(r)?;
        let mut entries = Vec::with_capacity(table_capacity(entry_count, data, 8));
        for _ in 0..entry_count {
            let count = read_u32(r)?;
            let delta = read_u32(r)?;
            entries.push((count, delta));
        }
        Ok(entries)
    })
}

/// Decode `ctts` into (sample_count, composition_offset) runs.
///
/// Version 0 offsets are unsigned on paper but encoders write negative
/// values into them anyway, so both versions are read as signed.
pub fn decode_ctts(data: &[u8]) -> Result<Vec<(u32, i32)>> {
    decode(BoxType::CTTS, data, |r| {
        let (version, _flags) = read_fullbox_header(r)?;
        let entry_count = read_u32(r)?;
        let mut entries = Vec::with_capacity(table_capacity(entry_count, data, 8));
        for _ in 0..entry_count {
            let count = read_u32(r)?;
            let offset = if version == 0 {
                read_u32(r)? as i32
            } else {
                read_i32(r)?
            };
            entries.push((count, offset));
        }
        Ok(entries)
    })
}

/// Decode `stss` into 1-based sync sample numbers.
pub fn decode_stss(data: &[u8]) -> Result<Vec<u32>> {
    decode(BoxType::STSS, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let entry_count = read_u32(r)?;
        let mut samples = Vec::with_capacity(table_capacity(entry_count, data, 4));
        for _ in 0..entry_count {
            samples.push(read_u32(r)?);
        }
        Ok(samples)
    })
}

/// One `stsc` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StscEntry {
    /// 1-based index of the first chunk this run applies to.
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Decode `stsc`.
pub fn decode_stsc(data: &[u8]) -> Result<Vec<StscEntry>> {
    decode(BoxType::STSC, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let entry_count = read_u32(r)?;
        let mut entries = Vec::with_capacity(table_capacity(entry_count, data, 12));
        for _ in 0..entry_count {
            entries.push(StscEntry {
                first_chunk: read_u32(r)?,
                samples_per_chunk: read_u32(r)?,
                sample_description_index: read_u32(r)?,
            });
        }
        Ok(entries)
    })
}

/// Decoded `stsz`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSizes {
    /// Non-zero when every sample has this size.
    pub uniform_size: u32,
    pub sample_count: u32,
    /// Per-sample sizes, empty when `uniform_size` is set.
    pub sizes: Vec<u32>,
}

/// Decode `stsz`.
pub fn decode_stsz(data: &[u8]) -> Result<SampleSizes> {
    decode(BoxType::STSZ, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let uniform_size = read_u32(r)?;
        let sample_count = read_u32(r)?;
        let mut sizes = Vec::new();
        if uniform_size == 0 {
            sizes.reserve(table_capacity(sample_count, data, 4));
            for _ in 0..sample_count {
                sizes.push(read_u32(r)?);
            }
        }
        Ok(SampleSizes {
            uniform_size,
            sample_count,
            sizes,
        })
    })
}

/// Decode `stco` (32-bit) or `co64` (64-bit) chunk offsets.
pub fn decode_chunk_offsets(box_type: BoxType, data: &[u8]) -> Result<Vec<u64>> {
    let wide = box_type == BoxType::CO64;
    decode(box_type, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        let entry_count = read_u32(r)?;
        let entry_size = if wide { 8 } else { 4 };
        let mut offsets = Vec::with_capacity(table_capacity(entry_count, data, entry_size));
        for _ in 0..entry_count {
            let offset = if wide {
                read_u64(r)?
            } else {
                read_u32(r)? as u64
            };
            offsets.push(offset);
        }
        Ok(offsets)
    })
}

/// The first AVC visual sample entry of an `stsd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcSampleEntry {
    /// `avc1` or `avc3`.
    pub format: BoxType,
    pub width: u16,
    pub height: u16,
    pub config: Option<AvcDecoderConfiguration>,
}

/// Decode `stsd`, returning the first `avc1`/`avc3` entry if there is one.
pub fn decode_avc_sample_entry(data: &[u8]) -> Result<Option<AvcSampleEntry>> {
    let entry_count = decode(BoxType::STSD, data, |r| {
        let (_version, _flags) = read_fullbox_header(r)?;
        read_u32(r)
    })?;

    let mut cursor = Cursor::new(data);
    let end = data.len() as u64;
    let entries = read_children(&mut cursor, BoxType::STSD.children_offset(), end)?;

    for entry in entries.iter().take(entry_count as usize) {
        if !entry.box_type.is_avc_sample_entry() {
            continue;
        }
        if entry.content_size() < entry.box_type.children_offset() {
            return Err(Error::Truncated(entry.box_type));
        }

        // reserved(6) + data_reference_index(2) + pre_defined/reserved(16)
        cursor.seek(SeekFrom::Start(entry.content_offset() + 24))?;
        let width = read_u16(&mut cursor).map_err(|e| truncated_or_io(entry.box_type, e))?;
        let height = read_u16(&mut cursor).map_err(|e| truncated_or_io(entry.box_type, e))?;

        let children_start = entry.content_offset() + entry.box_type.children_offset();
        let mut config = None;
        for child in read_children(&mut cursor, children_start, entry.end())? {
            if child.box_type == BoxType::AVCC {
                let bytes = &data[child.content_offset() as usize..child.end() as usize];
                config = Some(AvcDecoderConfiguration::parse(bytes)?);
                break;
            }
        }

        return Ok(Some(AvcSampleEntry {
            format: entry.box_type,
            width,
            height,
            config,
        }));
    }

    Ok(None)
}
