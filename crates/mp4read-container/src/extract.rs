//! Targeted payload extraction by box path.
//!
//! Results come back as a flat list in file order. Nothing in an extracted box
//! says which track it belongs to; callers that need the association rely on
//! a trak's `tkhd` being traversed before the rest of that trak's matches.

use std::io::{Read, Seek, SeekFrom};

use crate::atoms::{read_box_data, read_children, BoxType};
use crate::avcc::AvcDecoderConfiguration;
use crate::boxes::{self, TrackHeader};
use crate::Result;

/// A path of box types from the file root, e.g. `moov/trak/tkhd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxPath(Vec<BoxType>);

impl BoxPath {
    pub fn new(types: &[BoxType]) -> Self {
        Self(types.to_vec())
    }

    /// `moov/trak/tkhd`
    pub fn track_header() -> Self {
        Self::new(&[BoxType::MOOV, BoxType::TRAK, BoxType::TKHD])
    }

    /// `moov/trak/mdia/minf/stbl/stss`
    pub fn sync_samples() -> Self {
        Self::new(&[
            BoxType::MOOV,
            BoxType::TRAK,
            BoxType::MDIA,
            BoxType::MINF,
            BoxType::STBL,
            BoxType::STSS,
        ])
    }

    /// `moov/trak/mdia/minf/stbl/stsd/avc1/avcC`
    pub fn avc_configuration() -> Self {
        Self::new(&[
            BoxType::MOOV,
            BoxType::TRAK,
            BoxType::MDIA,
            BoxType::MINF,
            BoxType::STBL,
            BoxType::STSD,
            BoxType::AVC1,
            BoxType::AVCC,
        ])
    }

    pub fn types(&self) -> &[BoxType] {
        &self.0
    }

    fn is_strict_extension_of(&self, prefix: &[BoxType]) -> bool {
        self.0.len() > prefix.len() && self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for BoxPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(BoxType::as_str).collect();
        write!(f, "{}", parts.join("/"))
    }
}

/// Decoded payload of an extracted box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxPayload {
    TrackHeader(TrackHeader),
    /// 1-based sync sample numbers from `stss`.
    SyncSamples(Vec<u32>),
    AvcConfiguration(AvcDecoderConfiguration),
    /// Content of any other requested box, header stripped.
    Raw(Vec<u8>),
}

/// One box matching a requested path.
#[derive(Debug, Clone)]
pub struct ExtractedBox {
    pub box_type: BoxType,
    /// File offset of the box header.
    pub offset: u64,
    /// Total box size including the header.
    pub size: u64,
    pub payload: BoxPayload,
}

/// Extract every box matching one of `paths`, depth first in file order.
///
/// Only boxes lying on a requested path are descended into.
pub fn extract_boxes<R: Read + Seek>(
    reader: &mut R,
    paths: &[BoxPath],
) -> Result<Vec<ExtractedBox>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    walk(reader, paths, 0, file_size, &mut prefix, &mut out)?;
    Ok(out)
}

fn walk<R: Read + Seek>(
    reader: &mut R,
    paths: &[BoxPath],
    start: u64,
    end: u64,
    prefix: &mut Vec<BoxType>,
    out: &mut Vec<ExtractedBox>,
) -> Result<()> {
    for header in read_children(reader, start, end)? {
        prefix.push(header.box_type);

        if paths.iter().any(|p| p.types() == prefix.as_slice()) {
            let data = read_box_data(reader, &header)?;
            out.push(ExtractedBox {
                box_type: header.box_type,
                offset: header.offset,
                size: header.size,
                payload: decode_payload(header.box_type, data)?,
            });
        }

        if paths.iter().any(|p| p.is_strict_extension_of(prefix.as_slice())) {
            let children_start = header.content_offset() + header.box_type.children_offset();
            if children_start <= header.end() {
                walk(reader, paths, children_start, header.end(), prefix, out)?;
            }
        }

        prefix.pop();
    }
    Ok(())
}

fn decode_payload(box_type: BoxType, data: Vec<u8>) -> Result<BoxPayload> {
    Ok(match box_type {
        BoxType::TKHD => BoxPayload::TrackHeader(boxes::decode_tkhd(&data)?),
        BoxType::STSS => BoxPayload::SyncSamples(boxes::decode_stss(&data)?),
        BoxType::AVCC => BoxPayload::AvcConfiguration(AvcDecoderConfiguration::parse(&data)?),
        _ => BoxPayload::Raw(data),
    })
}
