//! `VideoReader`: track selection, sequential reading and seeking over one
//! H.264 track of an MP4 file.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::time::Duration;

use mp4read_container::{find_idr_frames, probe, ContainerInfo, TrackSummary};
use tracing::{debug, info, warn};

use crate::cursor::{CursorState, SampleInfo};
use crate::mdat::read_sample_data;
use crate::metadata::load_track_metadata;
use crate::options::ReaderOptions;
use crate::seek::{locate_keyframe, KeyframeIndex, SeekOutcome};
use crate::timing::{start_time_offset, ticks_to_duration};
use crate::track::{select_video_track, video_track_ids, TrackSelection, VideoInfo};
use crate::{Error, Result};

/// Per-track state created by [`VideoReader::initialize`].
#[derive(Debug)]
struct Session {
    cursor: CursorState,
    keyframes: KeyframeIndex,
    parameter_sets: Vec<Vec<u8>>,
    start_offset: i64,
}

/// Reads samples of one H.264 track.
///
/// Opening probes the container and selects the first video track. Call
/// [`initialize`](Self::initialize) before reading or seeking.
///
/// ```no_run
/// use mp4read_core::VideoReader;
///
/// let mut reader = VideoReader::open("input.mp4")?;
/// reader.initialize()?;
/// let mut buf = Vec::new();
/// loop {
///     let sample = match reader.next_sample() {
///         Ok(sample) => sample,
///         Err(e) if e.is_end_of_stream() => break,
///         Err(e) => return Err(e),
///     };
///     let data = reader.read_sample_data(&sample, &mut buf)?;
///     println!("#{} {} bytes", sample.number, data.len());
/// }
/// # Ok::<(), mp4read_core::Error>(())
/// ```
#[derive(Debug)]
pub struct VideoReader<R> {
    reader: R,
    container: ContainerInfo,
    options: ReaderOptions,
    track: usize,
    session: Option<Session>,
}

impl VideoReader<BufReader<File>> {
    /// Open a file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening MP4 file");
        let file = File::open(path)?;
        Self::with_options(BufReader::with_capacity(options.read_buffer_size, file), options)
    }
}

impl<R: Read + Seek> VideoReader<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Probe `reader` and select its first video track.
    pub fn with_options(mut reader: R, options: ReaderOptions) -> Result<Self> {
        let container = probe(&mut reader)?;
        let track = select_video_track(&container, TrackSelection::First)?;
        info!(
            tracks = container.tracks.len(),
            track_id = container.tracks[track].track_id,
            "Probed MP4 container"
        );
        Ok(Self {
            reader,
            container,
            options,
            track,
            session: None,
        })
    }

    pub fn container(&self) -> &ContainerInfo {
        &self.container
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// IDs of every H.264 track.
    pub fn video_tracks(&self) -> Vec<u32> {
        video_track_ids(&self.container)
    }

    /// Switch to another video track.
    ///
    /// Cursor, keyframe index and codec configuration are discarded, so the
    /// reader needs [`initialize`](Self::initialize) again. On error the
    /// current selection is kept.
    pub fn select_track(&mut self, selection: impl Into<TrackSelection>) -> Result<()> {
        let track = select_video_track(&self.container, selection.into())?;
        self.track = track;
        self.session = None;
        debug!(track_id = self.container.tracks[track].track_id, "Selected video track");
        Ok(())
    }

    /// The selected track.
    pub fn track(&self) -> &TrackSummary {
        &self.container.tracks[self.track]
    }

    pub fn track_id(&self) -> u32 {
        self.track().track_id
    }

    /// Load the codec configuration and keyframe table and rewind the cursor.
    ///
    /// Fails with [`Error::ConfigurationMissing`] when the track has no
    /// `avcC`. Calling it again rewinds to the start.
    pub fn initialize(&mut self) -> Result<()> {
        let track = &self.container.tracks[self.track];
        let metadata = load_track_metadata(&mut self.reader, track.track_id)?;
        let start_offset = start_time_offset(&track.samples);

        debug!(
            track_id = track.track_id,
            samples = track.samples.len(),
            keyframes = metadata.keyframes.as_ref().map(Vec::len),
            start_offset,
            "Initialized video track"
        );

        self.session = Some(Session {
            cursor: CursorState::default(),
            keyframes: metadata.keyframes.map_or(KeyframeIndex::NotBuilt, KeyframeIndex::Built),
            parameter_sets: metadata.parameter_sets,
            start_offset,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// SPS then PPS NAL units, empty before initialization.
    pub fn codec_configuration(&self) -> &[Vec<u8>] {
        match &self.session {
            Some(session) => session.parameter_sets.as_slice(),
            None => &[],
        }
    }

    /// Normalization offset subtracted from every composition time.
    pub fn start_time_offset(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.start_offset)
    }

    pub fn video_info(&self) -> VideoInfo {
        VideoInfo::from_track(self.track())
    }

    /// Track duration in timescale ticks.
    pub fn duration(&self) -> u64 {
        self.track().duration
    }

    pub fn timescale(&self) -> u32 {
        self.track().timescale
    }

    /// Track duration as wall time.
    pub fn time_duration(&self) -> Duration {
        let track = self.track();
        ticks_to_duration(track.duration, track.timescale)
    }

    /// Advance to the next non-empty sample.
    ///
    /// Returns [`Error::EndOfStream`] once every sample has been returned.
    pub fn next_sample(&mut self) -> Result<SampleInfo> {
        let track = &self.container.tracks[self.track];
        let session = self
            .session
            .as_mut()
            .ok_or(Error::NotInitialized(track.track_id))?;
        session
            .cursor
            .advance(track, session.start_offset)
            .ok_or(Error::EndOfStream)
    }

    /// Iterate the remaining samples. Ends quietly at end of stream.
    pub fn samples(&mut self) -> Samples<'_, R> {
        Samples { reader: self }
    }

    /// Read the payload of `info` into `buf`, bounded by `max_sample_size`.
    pub fn read_sample_data<'b>(
        &mut self,
        info: &SampleInfo,
        buf: &'b mut Vec<u8>,
    ) -> Result<&'b [u8]> {
        read_sample_data(&mut self.reader, info, buf, self.options.max_sample_size)
    }

    /// Reposition the cursor at the keyframe preceding `timestamp`.
    ///
    /// `timestamp` is a normalized composition time in track ticks. Returns
    /// `true` if the cursor moved. Without `force`, a target inside the GOP the
    /// cursor is already reading leaves it in place. Tracks without a sync
    /// sample table are scanned for IDR slices on the first seek.
    pub fn seek(&mut self, timestamp: i64, force: bool) -> Result<bool> {
        let track = &self.container.tracks[self.track];
        let session = self
            .session
            .as_mut()
            .ok_or(Error::NotInitialized(track.track_id))?;

        let reader = &mut self.reader;
        let keyframes = session.keyframes.get_or_build(|| {
            warn!(
                track_id = track.track_id,
                "No sync sample table, scanning samples for IDR frames"
            );
            let indices = find_idr_frames(reader, track)?;
            Ok(indices.into_iter().map(|i| i as u32 + 1).collect())
        })?;

        let outcome = locate_keyframe(
            track,
            keyframes,
            timestamp,
            session.start_offset,
            &session.cursor,
            force,
        )?;
        match outcome {
            SeekOutcome::Unchanged => Ok(false),
            SeekOutcome::Moved(state) => {
                session.cursor = state;
                Ok(true)
            }
        }
    }

    /// Sample numbers of the keyframe index, if it has been built.
    pub fn keyframes(&self) -> Option<&[u32]> {
        self.session.as_ref().and_then(|s| s.keyframes.sample_numbers())
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Give back the underlying stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Release the stream. Equivalent to dropping the reader.
    pub fn close(self) {
        debug!(track_id = self.track_id(), "Closing reader");
    }
}

/// Iterator returned by [`VideoReader::samples`].
#[derive(Debug)]
pub struct Samples<'a, R> {
    reader: &'a mut VideoReader<R>,
}

impl<R: Read + Seek> Iterator for Samples<'_, R> {
    type Item = Result<SampleInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.next_sample() {
            Ok(info) => Some(Ok(info)),
            Err(e) if e.is_end_of_stream() => None,
            Err(e) => Some(Err(e)),
        }
    }
}
