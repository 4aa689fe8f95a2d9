//! Scripted [`DemuxEngine`] for tests

use std::collections::VecDeque;

use bytes::Bytes;

use crate::demux::{DemuxEngine, DemuxEvent, MovieInfo, Sample, TrackInfo, TrackKind};

/// Build a text sample with the 2-byte length prefix
pub fn text_sample(number: u32, dts: u64, duration: u32, timescale: u32, text: &str) -> Sample {
    let mut data = (text.len() as u16).to_be_bytes().to_vec();
    data.extend_from_slice(text.as_bytes());
    Sample {
        number,
        dts,
        duration,
        timescale,
        data: Bytes::from(data),
    }
}

/// A subtitle track description
pub fn subtitle_track(id: u32, sample_count: u32, timescale: u32, language: &str) -> TrackInfo {
    TrackInfo {
        id,
        kind: TrackKind::Subtitle,
        codec: Some("tx3g".to_string()),
        language: Some(language.to_string()),
        sample_count,
        timescale,
    }
}

/// A non-subtitle track description
pub fn media_track(id: u32, kind: TrackKind) -> TrackInfo {
    TrackInfo {
        id,
        kind,
        codec: None,
        language: None,
        sample_count: 100,
        timescale: 90_000,
    }
}

/// Engine that replays a fixed script instead of parsing boxes
///
/// `Ready` fires once the appended data reaches `ready_at`. Batches added
/// with [`ScriptedDemuxEngine::on_start`] are returned from `start`; batches
/// added with [`ScriptedDemuxEngine::on_append`] are returned one per append
/// after `start`.
#[derive(Debug, Default)]
pub struct ScriptedDemuxEngine {
    movie: MovieInfo,
    ready_at: u64,
    error_at: Option<u64>,
    finish_on_start: bool,
    start_batches: Vec<(u32, Vec<Sample>)>,
    append_batches: VecDeque<(u32, Vec<Sample>)>,
    ready_sent: bool,
    started: bool,
    /// `(offset, length)` of every appended buffer
    pub appended: Vec<(u64, usize)>,
    /// `(track_id, batch_size)` of every extraction request
    pub options: Vec<(u32, u32)>,
    /// `(track_id, sample_number)` of every release
    pub released: Vec<(u32, u32)>,
}

impl ScriptedDemuxEngine {
    pub fn new(movie: MovieInfo, ready_at: u64) -> Self {
        Self {
            movie,
            ready_at,
            ..Default::default()
        }
    }

    pub fn on_start(mut self, track_id: u32, samples: Vec<Sample>) -> Self {
        self.start_batches.push((track_id, samples));
        self
    }

    pub fn on_append(mut self, track_id: u32, samples: Vec<Sample>) -> Self {
        self.append_batches.push_back((track_id, samples));
        self
    }

    /// Report an error when a buffer covering `offset` is appended
    pub fn error_at(mut self, offset: u64) -> Self {
        self.error_at = Some(offset);
        self
    }

    /// Report `Finished` right after the start batches
    pub fn finish_on_start(mut self) -> Self {
        self.finish_on_start = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// True if any appended buffer overlaps `offset`
    pub fn was_fed(&self, offset: u64) -> bool {
        self.appended
            .iter()
            .any(|(start, len)| offset >= *start && offset < start + *len as u64)
    }
}

impl DemuxEngine for ScriptedDemuxEngine {
    fn append_buffer(&mut self, data: Bytes, file_offset: u64) -> Vec<DemuxEvent> {
        let end = file_offset + data.len() as u64;
        self.appended.push((file_offset, data.len()));

        if let Some(error_at) = self.error_at {
            if error_at >= file_offset && error_at < end {
                return vec![DemuxEvent::Error(format!("corrupt box at {}", error_at))];
            }
        }

        if !self.ready_sent && end >= self.ready_at {
            self.ready_sent = true;
            return vec![DemuxEvent::Ready(self.movie.clone())];
        }

        if self.started {
            if let Some((track_id, samples)) = self.append_batches.pop_front() {
                return vec![DemuxEvent::Samples { track_id, samples }];
            }
        }

        Vec::new()
    }

    fn set_extraction_options(&mut self, track_id: u32, batch_size: u32) {
        self.options.push((track_id, batch_size));
    }

    fn start(&mut self) -> Vec<DemuxEvent> {
        self.started = true;
        let mut events: Vec<DemuxEvent> = self
            .start_batches
            .drain(..)
            .map(|(track_id, samples)| DemuxEvent::Samples { track_id, samples })
            .collect();
        if self.finish_on_start {
            events.push(DemuxEvent::Finished);
        }
        events
    }

    fn release_used_samples(&mut self, track_id: u32, sample_number: u32) {
        self.released.push((track_id, sample_number));
    }
}
