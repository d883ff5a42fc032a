//! Length-prefixed H.264 NAL unit iteration (the AVCC sample format).

use crate::{Error, Result};

pub const NAL_TYPE_IDR_SLICE: u8 = 5;

/// `nal_unit_type` from the first byte of a NAL unit.
pub fn nal_unit_type(nal: &[u8]) -> Option<u8> {
    nal.first().map(|b| b & 0x1F)
}

/// Decode a big-endian length prefix of 1 to 4 bytes.
pub fn read_length_prefix(prefix: &[u8]) -> u32 {
    prefix.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Iterator over the NAL units of one sample.
#[derive(Debug, Clone)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    length_size: usize,
    pos: usize,
}

impl<'a> NalUnits<'a> {
    pub fn new(data: &'a [u8], length_size: u8) -> Self {
        Self {
            data,
            length_size: length_size as usize,
            pos: 0,
        }
    }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }

        let start = self.pos + self.length_size;
        if self.length_size == 0 || start > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(Error::invalid_mp4("truncated NAL length prefix")));
        }

        let len = read_length_prefix(&self.data[self.pos..start]) as usize;
        let end = start + len;
        if end > self.data.len() {
            self.pos = self.data.len();
            return Some(Err(Error::invalid_mp4(format!(
                "NAL unit of {} bytes overruns sample ({} bytes left)",
                len,
                self.data.len() - start
            ))));
        }

        self.pos = end;
        Some(Ok(&self.data[start..end]))
    }
}
