//! Interface of the box demultiplexing engine
//!
//! The engine is an external collaborator. It consumes byte ranges of the
//! file and answers with [`DemuxEvent`] messages, which the extractor applies
//! to its state machine.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Broad track category reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

/// One track of the movie header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: u32,
    pub kind: TrackKind,
    /// Sample entry codec, e.g. `tx3g` or `wvtt`
    pub codec: Option<String>,
    pub language: Option<String>,
    pub sample_count: u32,
    pub timescale: u32,
}

/// Movie header summary delivered with [`DemuxEvent::Ready`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieInfo {
    pub tracks: Vec<TrackInfo>,
}

impl MovieInfo {
    pub fn subtitle_tracks(&self) -> impl Iterator<Item = &TrackInfo> {
        self.tracks
            .iter()
            .filter(|track| track.kind == TrackKind::Subtitle)
    }
}

/// A demuxed sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Sample number within its track, starting at 0
    pub number: u32,
    /// Decode timestamp in `timescale` units
    pub dts: u64,
    pub duration: u32,
    pub timescale: u32,
    pub data: Bytes,
}

/// Engine reactions
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxEvent {
    /// The movie header has been parsed
    Ready(MovieInfo),
    /// A batch of samples for one track
    Samples { track_id: u32, samples: Vec<Sample> },
    /// The engine cannot continue
    Error(String),
    /// No extraction is pending anymore
    Finished,
}

/// Box demultiplexer fed with byte ranges of a file
pub trait DemuxEngine: Send {
    /// Append `data` read at absolute `file_offset`
    fn append_buffer(&mut self, data: Bytes, file_offset: u64) -> Vec<DemuxEvent>;

    /// Request samples of `track_id` in batches of `batch_size`
    fn set_extraction_options(&mut self, track_id: u32, batch_size: u32);

    /// Begin producing samples for the configured tracks
    fn start(&mut self) -> Vec<DemuxEvent>;

    /// Allow the engine to free samples of `track_id` up to `sample_number`
    fn release_used_samples(&mut self, track_id: u32, sample_number: u32);
}
