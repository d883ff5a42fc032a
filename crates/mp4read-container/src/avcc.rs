//! AVC decoder configuration record (the payload of an `avcC` box).

use std::io::Cursor;

use crate::atoms::{read_bytes, read_u16, read_u8, truncated_or_io, BoxType};
use crate::Result;

/// Parsed `AVCDecoderConfigurationRecord` (ISO/IEC 14496-15 §5.3.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfiguration {
    pub configuration_version: u8,
    pub profile_indication: u8,
    pub profile_compatibility: u8,
    pub level_indication: u8,
    /// Size in bytes of the length prefix in front of every NAL unit.
    pub length_size: u8,
    /// Sequence parameter set NAL units, in record order.
    pub sequence_parameter_sets: Vec<Vec<u8>>,
    /// Picture parameter set NAL units, in record order.
    pub picture_parameter_sets: Vec<Vec<u8>>,
}

impl AvcDecoderConfiguration {
    /// Parse the content of an `avcC` box (without the box header).
    ///
    /// Trailing high-profile extension fields are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let map = |e| truncated_or_io(BoxType::AVCC, e);

        let configuration_version = read_u8(&mut cursor).map_err(map)?;
        let profile_indication = read_u8(&mut cursor).map_err(map)?;
        let profile_compatibility = read_u8(&mut cursor).map_err(map)?;
        let level_indication = read_u8(&mut cursor).map_err(map)?;
        let length_size = (read_u8(&mut cursor).map_err(map)? & 0x03) + 1;

        let sps_count = read_u8(&mut cursor).map_err(map)? & 0x1F;
        let mut sequence_parameter_sets = Vec::with_capacity(sps_count as usize);
        for _ in 0..sps_count {
            let len = read_u16(&mut cursor).map_err(map)?;
            sequence_parameter_sets.push(read_bytes(&mut cursor, len as usize).map_err(map)?);
        }

        let pps_count = read_u8(&mut cursor).map_err(map)?;
        let mut picture_parameter_sets = Vec::with_capacity(pps_count as usize);
        for _ in 0..pps_count {
            let len = read_u16(&mut cursor).map_err(map)?;
            picture_parameter_sets.push(read_bytes(&mut cursor, len as usize).map_err(map)?);
        }

        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size,
            sequence_parameter_sets,
            picture_parameter_sets,
        })
    }

    /// All parameter sets, SPS first then PPS.
    pub fn parameter_sets(&self) -> impl Iterator<Item = &[u8]> {
        self.sequence_parameter_sets
            .iter()
            .chain(self.picture_parameter_sets.iter())
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const AVCC: [u8; 17] = [
        0x01, // configurationVersion
        0x64, // AVCProfileIndication (High)
        0x00, // profile_compatibility
        0x1F, // AVCLevelIndication (3.1)
        0xFC | 3, // lengthSizeMinusOne=3
        0xE0 | 1, // numOfSequenceParameterSets=1
        0x00, 0x04, // SPS length
        0x67, 0x64, 0x00, 0x1F, // SPS
        0x01, // numOfPictureParameterSets
        0x00, 0x02, // PPS length
        0x68, 0xEE, // PPS
    ];

    #[test]
    fn test_parse_avcc() {
        let config = AvcDecoderConfiguration::parse(&AVCC).unwrap();
        assert_eq!(config.profile_indication, 0x64);
        assert_eq!(config.level_indication, 0x1F);
        assert_eq!(config.length_size, 4);
        assert_eq!(config.sequence_parameter_sets, vec![vec![0x67, 0x64, 0x00, 0x1F]]);
        assert_eq!(config.picture_parameter_sets, vec![vec![0x68, 0xEE]]);

        let sets: Vec<&[u8]> = config.parameter_sets().collect();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0][0] & 0x1F, 7);
        assert_eq!(sets[1][0] & 0x1F, 8);
    }

    #[test]
    fn test_parse_avcc_two_byte_lengths() {
        let mut data = AVCC;
        data[4] = 0xFC | 1;
        let config = AvcDecoderConfiguration::parse(&data).unwrap();
        assert_eq!(config.length_size, 2);
    }

    #[test]
    fn test_parse_avcc_truncated() {
        let result = AvcDecoderConfiguration::parse(&AVCC[..10]);
        assert!(matches!(result, Err(Error::Truncated(BoxType::AVCC))));
    }
}
