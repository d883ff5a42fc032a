//! Structural scan of an MP4 file into per-track chunk and sample tables.

use std::io::{Read, Seek, SeekFrom};

use crate::atoms::{read_box_data, read_children, BoxHeader, BoxType};
use crate::boxes::{self, AvcSampleEntry};
use crate::sample_table::{Chunk, Sample, SampleTableBuilder};
use crate::{Error, Result};

/// Handler type for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerType {
    Video,
    Audio,
    Hint,
    Meta,
    Text,
    Unknown([u8; 4]),
}

impl HandlerType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"vide" => Self::Video,
            b"soun" => Self::Audio,
            b"hint" => Self::Hint,
            b"meta" => Self::Meta,
            b"text" => Self::Text,
            _ => Self::Unknown(bytes),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

/// Codec parameters of an H.264 track, taken from its sample entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvcParams {
    pub width: u16,
    pub height: u16,
    /// Bytes in the length prefix of each NAL unit (1, 2 or 4), from
    /// `avcC`. `None` when the sample entry has no `avcC`.
    pub length_size: Option<u8>,
}

/// One track as seen by the prober.
#[derive(Debug, Clone)]
pub struct TrackSummary {
    /// Track ID.
    pub track_id: u32,
    /// Handler type (video/audio/etc).
    pub handler_type: HandlerType,
    /// Media timescale (ticks per second).
    pub timescale: u32,
    /// Track duration in media timescale.
    pub duration: u64,
    /// Present for tracks with an avc1/avc3 sample entry.
    pub avc: Option<AvcParams>,
    /// Chunk table in file order.
    pub chunks: Vec<Chunk>,
    /// Sample table in decode order.
    pub samples: Vec<Sample>,
}

impl TrackSummary {
    fn new() -> Self {
        Self {
            track_id: 0,
            handler_type: HandlerType::Unknown([0; 4]),
            timescale: 0,
            duration: 0,
            avc: None,
            chunks: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Whether the track carries H.264 video this crate can read.
    pub fn is_avc_video(&self) -> bool {
        self.avc.is_some()
    }

    /// Get duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / self.timescale as f64
        }
    }
}

/// Result of probing a file.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Movie timescale from mvhd.
    pub timescale: u32,
    /// Movie duration in movie timescale.
    pub duration: u64,
    /// Tracks in moov order.
    pub tracks: Vec<TrackSummary>,
    /// Whether moov precedes mdat.
    pub has_faststart: bool,
}

/// Probe the box structure of an MP4 file.
pub fn probe<R: Read + Seek>(reader: &mut R) -> Result<ContainerInfo> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;
    Prober { reader, file_size }.parse()
}

struct Prober<'a, R> {
    reader: &'a mut R,
    file_size: u64,
}

impl<R: Read + Seek> Prober<'_, R> {
    fn parse(&mut self) -> Result<ContainerInfo> {
        let mut info = ContainerInfo {
            timescale: 0,
            duration: 0,
            tracks: Vec::new(),
            has_faststart: false,
        };

        let top_level = read_children(self.reader, 0, self.file_size)?;

        let moov = top_level
            .iter()
            .find(|b| b.box_type == BoxType::MOOV)
            .ok_or(Error::MissingBox("moov"))?;
        let mdat_offset = top_level
            .iter()
            .find(|b| b.box_type == BoxType::MDAT)
            .map(|b| b.offset);

        // Faststart means moov comes before mdat
        info.has_faststart = mdat_offset.map_or(true, |mdat| moov.offset < mdat);

        self.parse_moov(moov, &mut info)?;

        tracing::debug!(
            "probed {} tracks ({} AVC), faststart={}",
            info.tracks.len(),
            info.tracks.iter().filter(|t| t.is_avc_video()).count(),
            info.has_faststart
        );

        Ok(info)
    }

    fn children(&mut self, parent: &BoxHeader) -> Result<Vec<BoxHeader>> {
        read_children(self.reader, parent.content_offset(), parent.end())
    }

    fn parse_moov(&mut self, moov: &BoxHeader, info: &mut ContainerInfo) -> Result<()> {
        for child in &self.children(moov)? {
            match child.box_type {
                BoxType::MVHD => {
                    let data = read_box_data(self.reader, child)?;
                    let mvhd = boxes::decode_media_header(BoxType::MVHD, &data)?;
                    info.timescale = mvhd.timescale;
                    info.duration = mvhd.duration;
                }
                BoxType::TRAK => match self.parse_trak(child) {
                    Ok(track) => info.tracks.push(track),
                    Err(e) => {
                        tracing::warn!(
                            "skipping unreadable trak at offset {}: {}",
                            child.offset,
                            e
                        );
                    }
                },
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_trak(&mut self, trak: &BoxHeader) -> Result<TrackSummary> {
        let mut track = TrackSummary::new();

        for child in &self.children(trak)? {
            match child.box_type {
                BoxType::TKHD => {
                    let data = read_box_data(self.reader, child)?;
                    track.track_id = boxes::decode_tkhd(&data)?.track_id;
                }
                BoxType::MDIA => self.parse_mdia(child, &mut track)?,
                _ => {}
            }
        }

        Ok(track)
    }

    fn parse_mdia(&mut self, mdia: &BoxHeader, track: &mut TrackSummary) -> Result<()> {
        for child in &self.children(mdia)? {
            match child.box_type {
                BoxType::MDHD => {
                    let data = read_box_data(self.reader, child)?;
                    let mdhd = boxes::decode_media_header(BoxType::MDHD, &data)?;
                    track.timescale = mdhd.timescale;
                    track.duration = mdhd.duration;
                }
                BoxType::HDLR => {
                    let data = read_box_data(self.reader, child)?;
                    track.handler_type = HandlerType::from_bytes(boxes::decode_hdlr(&data)?);
                }
                BoxType::MINF => {
                    for grandchild in &self.children(child)? {
                        if grandchild.box_type == BoxType::STBL {
                            self.parse_stbl(grandchild, track)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_stbl(&mut self, stbl: &BoxHeader, track: &mut TrackSummary) -> Result<()> {
        let mut builder = SampleTableBuilder::new();

        for child in &self.children(stbl)? {
            let box_type = child.box_type;
            match box_type {
                BoxType::STSD => {
                    let data = read_box_data(self.reader, child)?;
                    track.avc = boxes::decode_avc_sample_entry(&data)?.map(avc_params);
                }
                BoxType::STTS => {
                    let data = read_box_data(self.reader, child)?;
                    builder.set_stts(boxes::decode_stts(&data)?);
                }
                BoxType::CTTS => {
                    let data = read_box_data(self.reader, child)?;
                    builder.set_ctts(boxes::decode_ctts(&data)?);
                }
                BoxType::STSC => {
                    let data = read_box_data(self.reader, child)?;
                    builder.set_stsc(boxes::decode_stsc(&data)?);
                }
                BoxType::STSZ => {
                    let data = read_box_data(self.reader, child)?;
                    builder.set_stsz(boxes::decode_stsz(&data)?);
                }
                BoxType::STCO | BoxType::CO64 => {
                    let data = read_box_data(self.reader, child)?;
                    builder.set_chunk_offsets(boxes::decode_chunk_offsets(box_type, &data)?);
                }
                _ => {}
            }
        }

        let (chunks, samples) = builder.build();
        track.chunks = chunks;
        track.samples = samples;
        Ok(())
    }
}

fn avc_params(entry: AvcSampleEntry) -> AvcParams {
    AvcParams {
        width: entry.width,
        height: entry.height,
        length_size: entry.config.map(|c| c.length_size),
    }
}
