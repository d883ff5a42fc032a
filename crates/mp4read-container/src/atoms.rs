//! ISO BMFF box header parsing and navigation.

use std::io::{self, Read, Seek, SeekFrom};

use crate::{Error, Result};

/// Maximum box payload (64 MiB) the parser buffers in memory.
pub const MAX_BOX_DATA_SIZE: u64 = 64 * 1024 * 1024;

/// Four-character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType(pub [u8; 4]);

impl BoxType {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSD: Self = Self(*b"stsd");
    pub const STTS: Self = Self(*b"stts");
    pub const STSS: Self = Self(*b"stss");
    pub const STSC: Self = Self(*b"stsc");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");
    pub const CTTS: Self = Self(*b"ctts");
    pub const AVC1: Self = Self(*b"avc1");
    pub const AVC3: Self = Self(*b"avc3");
    pub const AVCC: Self = Self(*b"avcC");
    pub const FREE: Self = Self(*b"free");
    pub const UDTA: Self = Self(*b"udta");

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Whether this is an AVC visual sample entry.
    pub fn is_avc_sample_entry(&self) -> bool {
        matches!(*self, Self::AVC1 | Self::AVC3)
    }

    /// Bytes of fixed fields between the box header and the first child box.
    ///
    /// `stsd` carries version/flags and an entry count; visual sample entries
    /// carry 78 bytes of SampleEntry + VisualSampleEntry fields.
    pub fn children_offset(&self) -> u64 {
        match *self {
            Self::STSD => 8,
            Self::AVC1 | Self::AVC3 => 78,
            _ => 0,
        }
    }
}

impl std::fmt::Display for BoxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed box header.
#[derive(Debug, Clone)]
pub struct BoxHeader {
    /// Box type code.
    pub box_type: BoxType,
    /// File offset of the first header byte.
    pub offset: u64,
    /// Total size of the box including the header.
    pub size: u64,
    /// Size of the header itself (8 or 16 for extended-size boxes).
    pub header_size: u64,
}

impl BoxHeader {
    /// Size of the box content (size - header_size).
    pub fn content_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size)
    }

    /// File offset where the box content starts.
    pub fn content_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    /// File offset one past the last byte of the box.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Read the box header at `pos`, bounded by the enclosing `end`.
///
/// Returns `Ok(None)` when fewer than 8 bytes remain before `end` or the
/// stream hits EOF.
pub fn read_box_header<R: Read + Seek>(
    reader: &mut R,
    pos: u64,
    end: u64,
) -> Result<Option<BoxHeader>> {
    if pos.saturating_add(8) > end {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(pos))?;

    let mut buf = [0u8; 8];
    match reader.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let size32 = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let box_type = BoxType([buf[4], buf[5], buf[6], buf[7]]);

    let (mut size, header_size) = match size32 {
        // 64-bit extended size
        1 => (read_u64(reader)?, 16u64),
        // Box extends to the end of its parent
        0 => (end - pos, 8u64),
        n => (n as u64, 8u64),
    };

    if size < header_size {
        return Err(Error::invalid_mp4(format!(
            "box {} at offset {} has size {} smaller than its header",
            box_type, pos, size
        )));
    }

    if pos + size > end {
        tracing::warn!(
            "box {} at offset {} overruns its parent by {} bytes, clamping",
            box_type,
            pos,
            pos + size - end
        );
        size = end - pos;
    }

    Ok(Some(BoxHeader {
        box_type,
        offset: pos,
        size,
        header_size,
    }))
}

/// Read every box header between `start` and `end`.
pub fn read_children<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
) -> Result<Vec<BoxHeader>> {
    let mut boxes = Vec::new();
    let mut pos = start;

    while let Some(header) = read_box_header(reader, pos, end)? {
        pos = header.end();
        boxes.push(header);
    }

    Ok(boxes)
}

/// Read a box's content into memory, rejecting oversized boxes.
pub fn read_box_data<R: Read + Seek>(reader: &mut R, header: &BoxHeader) -> Result<Vec<u8>> {
    let size = header.content_size();
    if size > MAX_BOX_DATA_SIZE {
        return Err(Error::BoxTooLarge {
            box_type: header.box_type,
            size,
            max: MAX_BOX_DATA_SIZE,
        });
    }
    reader.seek(SeekFrom::Start(header.content_offset()))?;
    read_bytes(reader, size as usize)
        .map_err(|e| truncated_or_io(header.box_type, e))
}

/// Map an `UnexpectedEof` from decoding box fields to [`Error::Truncated`].
pub(crate) fn truncated_or_io(box_type: BoxType, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated(box_type)
    } else {
        Error::Io(err)
    }
}

/// Read a big-endian u8.
pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a big-endian u16.
pub fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

/// Read a big-endian u32.
pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read a big-endian i32.
pub fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

/// Read a big-endian u64.
pub fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Read `n` bytes into a new Vec.
pub fn read_bytes<R: Read>(reader: &mut R, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a fullbox header (1 byte version + 3 bytes flags) and return (version, flags).
pub fn read_fullbox_header<R: Read>(reader: &mut R) -> io::Result<(u8, u32)> {
    let val = read_u32(reader)?;
    let version = (val >> 24) as u8;
    let flags = val & 0x00FFFFFF;
    Ok((version, flags))
}
