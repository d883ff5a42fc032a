//! Integration tests for VideoReader against generated MP4 files.

use std::io::Cursor;

use mp4read_container::fixture::{FixtureSample, FixtureTrack, Mp4Builder};
use mp4read_core::{Error, SampleInfo, TrackSelection, VideoReader};

/// 12 samples at 30 fps in 90 kHz ticks, GOPs of 4, spread over 3 chunks.
fn gop_track(track_id: u32) -> FixtureTrack {
    let samples = (0..12)
        .map(|i| {
            if i % 4 == 0 {
                FixtureSample::keyframe(200 + i, 3000)
            } else {
                FixtureSample::delta(50 + i, 3000)
            }
        })
        .collect();
    FixtureTrack::avc(track_id, samples).with_chunks(vec![5, 4, 3])
}

fn open(data: Vec<u8>) -> VideoReader<Cursor<Vec<u8>>> {
    let mut reader = VideoReader::from_reader(Cursor::new(data)).unwrap();
    reader.initialize().unwrap();
    reader
}

fn read_all<R: std::io::Read + std::io::Seek>(reader: &mut VideoReader<R>) -> Vec<SampleInfo> {
    reader.samples().collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn test_sample_numbers_increase_by_one() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    let samples = read_all(&mut reader);

    assert_eq!(samples.len(), 12);
    for pair in samples.windows(2) {
        assert_eq!(pair[1].number, pair[0].number + 1);
    }
    assert_eq!(samples[0].number, 0);
}

#[test]
fn test_duration_is_sum_of_deltas() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    let total: u64 = read_all(&mut reader).iter().map(|s| s.time_delta as u64).sum();
    assert_eq!(total, reader.duration());
    assert_eq!(reader.duration(), 36_000);
    assert_eq!(reader.time_duration().as_millis(), 400);
}

#[test]
fn test_offsets_are_contiguous_within_chunks() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    let samples = read_all(&mut reader);
    let chunks = reader.track().chunks.clone();

    let mut index = 0;
    for chunk in &chunks {
        let run = &samples[index..index + chunk.samples_per_chunk as usize];
        assert_eq!(run[0].offset, chunk.data_offset);
        for pair in run.windows(2) {
            assert_eq!(pair[1].offset, pair[0].offset + pair[0].size as u64);
        }
        index += run.len();
    }
    assert_eq!(index, samples.len());
}

#[test]
fn test_payloads_match_sample_kinds() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    let samples = read_all(&mut reader);

    let mut buf = Vec::new();
    for sample in &samples {
        let data = reader.read_sample_data(sample, &mut buf).unwrap();
        assert_eq!(data.len(), sample.size as usize);
        let expected = if sample.number % 4 == 0 { 5 } else { 1 };
        assert_eq!(data[4] & 0x1F, expected, "sample {}", sample.number);
    }
}

#[test]
fn test_reordered_stream_starts_at_zero() {
    // I P B B: decode 0, 3000, 6000, 9000
    let samples = vec![
        FixtureSample::keyframe(100, 3000).with_composition_offset(3000),
        FixtureSample::delta(60, 3000).with_composition_offset(9000),
        FixtureSample::delta(30, 3000).with_composition_offset(0),
        FixtureSample::delta(30, 3000).with_composition_offset(0),
    ];
    let mut reader = open(
        Mp4Builder::new()
            .track(FixtureTrack::avc(1, samples))
            .build(),
    );
    assert_eq!(reader.start_time_offset(), Some(3000));

    let times: Vec<i64> = read_all(&mut reader)
        .iter()
        .map(|s| s.composition_time)
        .collect();
    assert_eq!(times, vec![0, 9000, 3000, 6000]);
    assert_eq!(times.iter().min(), Some(&0));
}

#[test]
fn test_seek_to_max_timestamp_on_reordered_stream() {
    let samples = vec![
        FixtureSample::keyframe(100, 3000).with_composition_offset(3000),
        FixtureSample::delta(60, 3000).with_composition_offset(9000),
        FixtureSample::delta(30, 3000).with_composition_offset(0),
    ];
    let mut reader = open(
        Mp4Builder::new()
            .track(FixtureTrack::avc(1, samples))
            .build(),
    );
    assert_eq!(reader.start_time_offset(), Some(3000));

    assert!(matches!(reader.seek(i64::MAX, true), Err(Error::OutOfRange(_))));
    assert_eq!(reader.next_sample().unwrap().number, 0);
}

#[test]
fn test_empty_samples_are_skipped_but_timed() {
    let samples = vec![
        FixtureSample::keyframe(100, 3000),
        FixtureSample::empty(3000),
        FixtureSample::delta(40, 3000),
    ];
    let mut reader = open(
        Mp4Builder::new()
            .track(FixtureTrack::avc(1, samples))
            .build(),
    );
    let samples = read_all(&mut reader);

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].number, 2);
    assert_eq!(samples[1].composition_time, 6000);
    assert_eq!(samples[1].offset, samples[0].offset + samples[0].size as u64);
}

#[test]
fn test_forced_seek_lands_on_preceding_keyframe() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());

    for target in [0i64, 2999, 11_999, 12_000, 20_000, 33_000] {
        assert!(reader.seek(target, true).unwrap());
        let sample = reader.next_sample().unwrap();

        assert!(sample.composition_time <= target, "target {}", target);
        assert_eq!(sample.number % 4, 0, "target {}", target);
        // the following keyframe is already past the target
        assert!(sample.composition_time + 4 * 3000 > target, "target {}", target);
    }
}

#[test]
fn test_seek_out_of_range() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    assert!(matches!(reader.seek(36_000, true), Err(Error::OutOfRange(36_000))));
    // the cursor is untouched
    assert_eq!(reader.next_sample().unwrap().number, 0);
}

#[test]
fn test_seek_inside_current_gop_is_suppressed() {
    let data = Mp4Builder::new().track(gop_track(1)).build();
    let mut reader = open(data.clone());
    let mut reference = open(data);

    for _ in 0..6 {
        reader.next_sample().unwrap();
        reference.next_sample().unwrap();
    }
    // next sample is index 6, inside the GOP starting at index 4
    assert!(!reader.seek(19_000, false).unwrap());
    assert_eq!(reader.next_sample().unwrap(), reference.next_sample().unwrap());
}

#[test]
fn test_seek_outside_current_gop_moves() {
    let mut reader = open(Mp4Builder::new().track(gop_track(1)).build());
    reader.next_sample().unwrap();

    assert!(reader.seek(25_000, false).unwrap());
    assert_eq!(reader.next_sample().unwrap().number, 8);
}

#[test]
fn test_seek_reproduces_sequential_read() {
    let data = Mp4Builder::new().track(gop_track(1)).build();
    let mut fresh = open(data.clone());
    let all = read_all(&mut fresh);

    let mut reader = open(data);
    reader.seek(15_000, true).unwrap();
    let resumed = read_all(&mut reader);

    assert_eq!(resumed.first().map(|s| s.number), Some(4));
    assert_eq!(resumed.as_slice(), &all[4..]);
}

#[test]
fn test_negative_offsets_scenario() {
    // 3 chunks of 2 samples, deltas of 3000, offsets 0 3000 -3000 repeating
    let offsets = [0, 3000, -3000, 0, 3000, -3000];
    let samples = offsets
        .iter()
        .enumerate()
        .map(|(i, &cto)| {
            let sample = if i % 3 == 0 {
                FixtureSample::keyframe(80, 3000)
            } else {
                FixtureSample::delta(40, 3000)
            };
            sample.with_composition_offset(cto)
        })
        .collect();
    let mut reader = open(
        Mp4Builder::new()
            .track(FixtureTrack::avc(1, samples).with_chunks(vec![2, 2, 2]))
            .build(),
    );

    assert_eq!(reader.start_time_offset(), Some(0));
    assert_eq!(reader.keyframes(), Some(&[1, 4][..]));

    assert!(reader.seek(6000, true).unwrap());
    assert_eq!(reader.next_sample().unwrap().number, 0);

    assert!(reader.seek(12_000, true).unwrap());
    let sample = reader.next_sample().unwrap();
    assert_eq!(sample.number, 3);
    assert_eq!(sample.composition_time, 9000);
}

#[test]
fn test_seek_without_sync_table_scans_for_idr() {
    let data = Mp4Builder::new()
        .track(gop_track(1).without_sync_table())
        .build();
    let mut reader = open(data);
    assert_eq!(reader.keyframes(), None);

    assert!(reader.seek(27_000, true).unwrap());
    assert_eq!(reader.keyframes(), Some(&[1, 5, 9][..]));
    assert_eq!(reader.next_sample().unwrap().number, 8);
}

#[test]
fn test_missing_codec_configuration() {
    let data = Mp4Builder::new()
        .track(gop_track(1).without_avcc())
        .build();
    let mut reader = VideoReader::from_reader(Cursor::new(data)).unwrap();
    assert!(matches!(reader.initialize(), Err(Error::ConfigurationMissing(1))));
    assert!(!reader.is_initialized());
}

#[test]
fn test_codec_configuration() {
    let track = gop_track(1).with_parameter_sets(vec![0x67, 0x64, 0x00, 0x28], vec![0x68, 0xEB]);
    let reader = open(Mp4Builder::new().track(track).build());
    assert_eq!(
        reader.codec_configuration(),
        &[vec![0x67, 0x64, 0x00, 0x28], vec![0x68, 0xEB]]
    );
}

#[test]
fn test_select_between_video_tracks() {
    let second = FixtureTrack::avc(3, vec![FixtureSample::keyframe(500, 1001)])
        .with_timescale(30000)
        .with_dimensions(1280, 720);
    let data = Mp4Builder::new()
        .track(FixtureTrack::audio(1, vec![FixtureSample::raw(vec![0; 16], 1024)]))
        .track(gop_track(2))
        .track(second)
        .build();

    let mut reader = VideoReader::from_reader(Cursor::new(data)).unwrap();
    assert_eq!(reader.video_tracks(), vec![2, 3]);
    assert_eq!(reader.track_id(), 2);

    reader.select_track(TrackSelection::Id(3)).unwrap();
    reader.initialize().unwrap();
    let info = reader.video_info();
    assert_eq!((info.width, info.height), (1280, 720));
    assert_eq!(info.timescale, 30000);

    let sample = reader.next_sample().unwrap();
    assert_eq!(sample.size, 504);
    assert!(reader.next_sample().unwrap_err().is_end_of_stream());

    assert!(matches!(
        reader.select_track(TrackSelection::Id(1)),
        Err(Error::TrackNotFound(Some(1)))
    ));
}

#[test]
fn test_file_without_video() {
    let data = Mp4Builder::new()
        .track(FixtureTrack::audio(1, vec![FixtureSample::raw(vec![0; 16], 1024)]))
        .build();
    assert!(matches!(
        VideoReader::from_reader(Cursor::new(data)),
        Err(Error::TrackNotFound(None))
    ));
}

#[test]
fn test_open_faststart_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faststart.mp4");
    std::fs::write(&path, Mp4Builder::new().track(gop_track(1)).faststart().build()).unwrap();

    let mut reader = VideoReader::open(&path).unwrap();
    assert!(reader.container().has_faststart);
    reader.initialize().unwrap();
    assert_eq!(read_all(&mut reader).len(), 12);

    let file = reader.into_inner();
    assert_eq!(
        file.get_ref().metadata().unwrap().len(),
        std::fs::metadata(&path).unwrap().len()
    );
}
