//! Per-track metadata collected from `tkhd`, `stss` and `avcC`.
//!
//! The boxes arrive as one flat list in file order. Each `tkhd` opens a new
//! track context, and the `stss` / `avcC` that follow belong to it until the
//! next `tkhd`.

use std::io::{Read, Seek};

use mp4read_container::{extract_boxes, AvcDecoderConfiguration, BoxPath, BoxPayload, ExtractedBox};
use tracing::debug;

use crate::{Error, Result};

/// Metadata of the selected track that the sample tables do not carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    /// 1-based sync sample numbers, absent when the track has no `stss`.
    pub keyframes: Option<Vec<u32>>,
    /// SPS list followed by PPS list, from `avcC`.
    pub parameter_sets: Vec<Vec<u8>>,
}

/// One extracted box, tagged against the target track.
#[derive(Debug)]
enum Classified {
    TrackHeader(u32),
    KeyframeIndex(Vec<u32>),
    CodecConfiguration(AvcDecoderConfiguration),
    /// Belongs to another track, or precedes any `tkhd`.
    Foreign,
    Unrecognized,
}

#[derive(Debug, Default)]
struct Accumulator {
    seen_target: bool,
    keyframes: Option<Vec<u32>>,
    configuration: Option<AvcDecoderConfiguration>,
}

/// Box paths needed by [`load_track_metadata`].
pub fn metadata_paths() -> [BoxPath; 3] {
    [
        BoxPath::track_header(),
        BoxPath::sync_samples(),
        BoxPath::avc_configuration(),
    ]
}

/// Extract and collect the metadata of `track_id`.
pub fn load_track_metadata<R: Read + Seek>(reader: &mut R, track_id: u32) -> Result<TrackMetadata> {
    let boxes = extract_boxes(reader, &metadata_paths())?;
    debug!(track_id, boxes = boxes.len(), "Extracted track metadata boxes");
    collect_track_metadata(boxes, track_id)
}

/// Fold extracted boxes into the metadata of `track_id`.
///
/// Later `stss` or `avcC` boxes for the same track replace earlier ones.
pub fn collect_track_metadata<I>(boxes: I, track_id: u32) -> Result<TrackMetadata>
where
    I: IntoIterator<Item = ExtractedBox>,
{
    let acc = boxes
        .into_iter()
        .scan(None, |current: &mut Option<u32>, extracted| {
            Some(classify(current, track_id, extracted.payload))
        })
        .fold(Accumulator::default(), |mut acc, item| {
            match item {
                Classified::TrackHeader(id) => acc.seen_target |= id == track_id,
                Classified::KeyframeIndex(numbers) => acc.keyframes = Some(numbers),
                Classified::CodecConfiguration(config) => acc.configuration = Some(config),
                Classified::Foreign | Classified::Unrecognized => {}
            }
            acc
        });

    if !acc.seen_target {
        return Err(Error::TrackNotFound(Some(track_id)));
    }
    let configuration = acc.configuration.ok_or(Error::ConfigurationMissing(track_id))?;

    Ok(TrackMetadata {
        keyframes: acc.keyframes,
        parameter_sets: configuration.parameter_sets().map(<[u8]>::to_vec).collect(),
    })
}

fn classify(current: &mut Option<u32>, target: u32, payload: BoxPayload) -> Classified {
    match payload {
        BoxPayload::TrackHeader(tkhd) => {
            *current = Some(tkhd.track_id);
            Classified::TrackHeader(tkhd.track_id)
        }
        _ if *current != Some(target) => Classified::Foreign,
        BoxPayload::SyncSamples(numbers) => Classified::KeyframeIndex(numbers),
        BoxPayload::AvcConfiguration(config) => Classified::CodecConfiguration(config),
        BoxPayload::Raw(_) => Classified::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp4read_container::boxes::TrackHeader;
    use mp4read_container::fixture::{FixtureSample, FixtureTrack, Mp4Builder};
    use mp4read_container::BoxType;
    use std::io::Cursor;

    fn tkhd(track_id: u32) -> ExtractedBox {
        ExtractedBox {
            box_type: BoxType::TKHD,
            offset: 0,
            size: 0,
            payload: BoxPayload::TrackHeader(TrackHeader {
                track_id,
                duration: 0,
                width: 0,
                height: 0,
            }),
        }
    }

    fn stss(numbers: Vec<u32>) -> ExtractedBox {
        ExtractedBox {
            box_type: BoxType::STSS,
            offset: 0,
            size: 0,
            payload: BoxPayload::SyncSamples(numbers),
        }
    }

    fn avcc(sps: &[u8], pps: &[u8]) -> ExtractedBox {
        ExtractedBox {
            box_type: BoxType::AVCC,
            offset: 0,
            size: 0,
            payload: BoxPayload::AvcConfiguration(AvcDecoderConfiguration {
                configuration_version: 1,
                profile_indication: 0x64,
                profile_compatibility: 0,
                level_indication: 0x1F,
                length_size: 4,
                sequence_parameter_sets: vec![sps.to_vec()],
                picture_parameter_sets: vec![pps.to_vec()],
            }),
        }
    }

    #[test]
    fn test_boxes_attach_to_preceding_track() {
        let boxes = vec![
            tkhd(1),
            stss(vec![1, 5]),
            avcc(&[0x67, 1], &[0x68, 1]),
            tkhd(2),
            stss(vec![1, 30]),
            avcc(&[0x67, 2], &[0x68, 2]),
        ];

        let meta = collect_track_metadata(boxes.clone(), 2).unwrap();
        assert_eq!(meta.keyframes, Some(vec![1, 30]));
        assert_eq!(meta.parameter_sets, vec![vec![0x67, 2], vec![0x68, 2]]);

        let meta = collect_track_metadata(boxes, 1).unwrap();
        assert_eq!(meta.keyframes, Some(vec![1, 5]));
    }

    #[test]
    fn test_missing_stss_leaves_keyframes_unset() {
        let boxes = vec![tkhd(1), avcc(&[0x67], &[0x68])];
        let meta = collect_track_metadata(boxes, 1).unwrap();
        assert_eq!(meta.keyframes, None);
    }

    #[test]
    fn test_missing_avcc() {
        let boxes = vec![tkhd(1), stss(vec![1]), tkhd(2), avcc(&[0x67], &[0x68])];
        assert!(matches!(
            collect_track_metadata(boxes, 1),
            Err(Error::ConfigurationMissing(1))
        ));
    }

    #[test]
    fn test_boxes_before_any_tkhd_are_ignored() {
        let boxes = vec![stss(vec![9]), tkhd(1), avcc(&[0x67], &[0x68])];
        let meta = collect_track_metadata(boxes, 1).unwrap();
        assert_eq!(meta.keyframes, None);
    }

    #[test]
    fn test_unknown_track() {
        assert!(matches!(
            collect_track_metadata(vec![tkhd(1)], 7),
            Err(Error::TrackNotFound(Some(7)))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let data = Mp4Builder::new()
            .track(FixtureTrack::audio(1, vec![FixtureSample::raw(vec![0; 8], 1024)]))
            .track(
                FixtureTrack::avc(
                    2,
                    vec![
                        FixtureSample::keyframe(10, 3000),
                        FixtureSample::delta(10, 3000),
                        FixtureSample::keyframe(10, 3000),
                    ],
                )
                .with_parameter_sets(vec![0x67, 0x64, 0x00, 0x1F], vec![0x68, 0xEE]),
            )
            .build();

        let meta = load_track_metadata(&mut Cursor::new(data), 2).unwrap();
        assert_eq!(meta.keyframes, Some(vec![1, 3]));
        assert_eq!(
            meta.parameter_sets,
            vec![vec![0x67, 0x64, 0x00, 0x1F], vec![0x68, 0xEE]]
        );
    }
}
