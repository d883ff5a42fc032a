//! Video track selection.

use mp4read_container::{ContainerInfo, TrackSummary};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which video track to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSelection {
    /// The first H.264 track in moov order.
    #[default]
    First,
    /// The H.264 track with this track ID.
    Id(u32),
}

impl From<u32> for TrackSelection {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl From<Option<u32>> for TrackSelection {
    fn from(id: Option<u32>) -> Self {
        id.map_or(Self::First, Self::Id)
    }
}

/// IDs of every H.264 track, in moov order.
pub fn video_track_ids(info: &ContainerInfo) -> Vec<u32> {
    info.tracks
        .iter()
        .filter(|t| t.is_avc_video())
        .map(|t| t.track_id)
        .collect()
}

/// Index into `info.tracks` of the selected H.264 track.
pub fn select_video_track(info: &ContainerInfo, selection: TrackSelection) -> Result<usize> {
    info.tracks
        .iter()
        .position(|t| {
            t.is_avc_video()
                && match selection {
                    TrackSelection::First => true,
                    TrackSelection::Id(id) => t.track_id == id,
                }
        })
        .ok_or(Error::TrackNotFound(match selection {
            TrackSelection::First => None,
            TrackSelection::Id(id) => Some(id),
        }))
}

/// Summary of the selected video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct VideoInfo {
    pub track_id: u32,
    pub width: u32,
    pub height: u32,
    /// Duration in timescale ticks.
    pub duration: u64,
    /// Ticks per second.
    pub timescale: u32,
    /// Number of samples, including zero-sized ones.
    pub samples: usize,
}

impl VideoInfo {
    pub fn from_track(track: &TrackSummary) -> Self {
        let (width, height) = track
            .avc
            .map_or((0, 0), |avc| (avc.width as u32, avc.height as u32));
        Self {
            track_id: track.track_id,
            width,
            height,
            duration: track.duration,
            timescale: track.timescale,
            samples: track.samples.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp4read_container::{AvcParams, HandlerType};

    fn track(track_id: u32, avc: bool) -> TrackSummary {
        TrackSummary {
            track_id,
            handler_type: if avc { HandlerType::Video } else { HandlerType::Audio },
            timescale: 90000,
            duration: 0,
            avc: avc.then_some(AvcParams {
                width: 1920,
                height: 1080,
                length_size: Some(4),
            }),
            chunks: vec![],
            samples: vec![],
        }
    }

    fn container(tracks: Vec<TrackSummary>) -> ContainerInfo {
        ContainerInfo {
            timescale: 1000,
            duration: 0,
            tracks,
            has_faststart: true,
        }
    }

    #[test]
    fn test_video_track_ids_skip_audio() {
        let info = container(vec![track(1, false), track(2, true), track(3, true)]);
        assert_eq!(video_track_ids(&info), vec![2, 3]);
    }

    #[test]
    fn test_select_first_and_by_id() {
        let info = container(vec![track(1, false), track(2, true), track(3, true)]);
        assert_eq!(select_video_track(&info, TrackSelection::First).unwrap(), 1);
        assert_eq!(select_video_track(&info, TrackSelection::Id(3)).unwrap(), 2);
    }

    #[test]
    fn test_select_rejects_non_video_id() {
        let info = container(vec![track(1, false), track(2, true)]);
        assert!(matches!(
            select_video_track(&info, TrackSelection::Id(1)),
            Err(Error::TrackNotFound(Some(1)))
        ));
    }

    #[test]
    fn test_select_without_video() {
        let info = container(vec![track(1, false)]);
        assert!(matches!(
            select_video_track(&info, TrackSelection::from(None)),
            Err(Error::TrackNotFound(None))
        ));
    }

    #[test]
    fn test_video_info() {
        let info = VideoInfo::from_track(&track(5, true));
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.track_id, 5);
        assert_eq!(info.timescale, 90000);
    }
}
