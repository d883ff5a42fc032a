//! Annex B byte stream output.
//!
//! Rewrites length-prefixed samples with 4-byte start codes so the result can
//! be fed to decoders or written as a raw `.h264` elementary stream.

use std::io::Write;

use mp4read_container::NalUnits;

use crate::Result;

pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Write each parameter set behind a start code.
pub fn write_parameter_sets<W: Write>(out: &mut W, parameter_sets: &[Vec<u8>]) -> Result<()> {
    for nal in parameter_sets {
        out.write_all(&START_CODE)?;
        out.write_all(nal)?;
    }
    Ok(())
}

/// Convert one length-prefixed sample and write it. Returns the NAL count.
pub fn write_access_unit<W: Write>(out: &mut W, sample: &[u8], length_size: u8) -> Result<usize> {
    let mut count = 0;
    for nal in NalUnits::new(sample, length_size) {
        let nal = nal?;
        out.write_all(&START_CODE)?;
        out.write_all(nal)?;
        count += 1;
    }
    Ok(count)
}
