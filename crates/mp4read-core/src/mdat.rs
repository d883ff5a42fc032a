//! Sample payload reads from mdat.

use std::io::{Read, Seek, SeekFrom};

use crate::cursor::SampleInfo;
use crate::{Error, Result};

/// Read the payload described by `info` into `buf`.
///
/// `buf` is resized to the sample size and reused across calls so a caller
/// reading a whole track allocates only as often as the largest sample grows.
/// Samples above `max_sample_size` fail before anything is read.
pub fn read_sample_data<'b, R: Read + Seek>(
    reader: &mut R,
    info: &SampleInfo,
    buf: &'b mut Vec<u8>,
    max_sample_size: usize,
) -> Result<&'b [u8]> {
    let size = info.size as usize;
    if size > max_sample_size {
        return Err(Error::CapacityExceeded {
            size: info.size,
            limit: max_sample_size,
        });
    }

    reader.seek(SeekFrom::Start(info.offset))?;
    buf.resize(size, 0);
    reader.read_exact(buf)?;
    Ok(buf.as_slice())
}
