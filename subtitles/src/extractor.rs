//! Remote MP4 indexing and subtitle extraction
//!
//! Phase A walks the top-level boxes of the file with one small ranged GET per
//! header. Phase B streams the structural boxes into a [`DemuxEngine`] and
//! collects subtitle samples as cues, fetching the media data box last and
//! only when samples are still missing.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use dlna_transport::{HttpClient, HttpRequest};
use tracing::{debug, info, trace, warn};

use crate::atom::{parse_atom_header, Atom, Mp4Metadata};
use crate::config::SubtitleConfig;
use crate::demux::{DemuxEngine, DemuxEvent, Sample};
use crate::error::{Result, SubtitleError};
use crate::state::{ExtractionState, Signal};
use crate::track::{Cue, SubtitleTrack};

/// Extracts subtitle tracks from the MP4 file at one URL
#[derive(Clone)]
pub struct SubtitleExtractor {
    http: Arc<dyn HttpClient>,
    url: String,
    config: SubtitleConfig,
}

impl std::fmt::Debug for SubtitleExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleExtractor")
            .field("url", &self.url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SubtitleExtractor {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            url: url.into(),
            config: SubtitleConfig::default(),
        }
    }

    /// # Errors
    ///
    /// `Protocol` when `config` fails [`SubtitleConfig::validate`].
    pub fn with_config(
        url: impl Into<String>,
        http: Arc<dyn HttpClient>,
        config: SubtitleConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http,
            url: url.into(),
            config,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Index the top-level boxes of the file
    ///
    /// # Errors
    ///
    /// `NotMp4` when the box sequence is malformed, `Network` or `Protocol`
    /// when the server does not cooperate.
    pub async fn get_mp4_metadata(&self) -> Result<Mp4Metadata> {
        let head = self
            .http
            .execute(HttpRequest::head(&self.url))
            .await?
            .error_for_status(&self.url)?;

        let size = head.content_length().ok_or_else(|| {
            SubtitleError::Protocol(format!("HEAD {} returned no Content-Length", self.url))
        })?;

        if size == 0 {
            return Err(SubtitleError::not_mp4(0, "empty file"));
        }

        let mut atoms = Vec::new();
        let mut pos = 0u64;

        while pos < size {
            let remaining = size - pos;
            if remaining < 8 {
                return Err(SubtitleError::not_mp4(pos, "trailing bytes shorter than a box header"));
            }

            let probe_len = self.config.header_probe_size.min(remaining);
            let probe = self.fetch_range(pos, probe_len).await?;
            let header = parse_atom_header(&probe, pos)?;

            if header.size > remaining {
                return Err(SubtitleError::not_mp4(
                    pos,
                    format!("{} box of {} bytes runs past end of file", header.atom_type, header.size),
                ));
            }

            trace!(atom_type = %header.atom_type, size = header.size, pos, "Indexed box");
            atoms.push(Atom {
                atom_type: header.atom_type,
                size: header.size,
                pos,
            });
            pos += header.size;
        }

        debug!(url = %self.url, size, count = atoms.len(), "MP4 box index complete");
        Ok(Mp4Metadata { size, atoms })
    }

    /// [`SubtitleExtractor::get_mp4_metadata`], with any failure logged and
    /// turned into an empty index
    pub async fn index_atoms_or_empty(&self) -> Mp4Metadata {
        match self.get_mp4_metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(url = %self.url, error = %e, "MP4 indexing failed");
                Mp4Metadata::default()
            }
        }
    }

    /// Index the file, then extract its subtitle tracks
    ///
    /// Returns an empty list when indexing fails.
    pub async fn extract_subtitles(&self, engine: &mut dyn DemuxEngine) -> Vec<SubtitleTrack> {
        let metadata = self.index_atoms_or_empty().await;
        if metadata.is_empty() {
            return Vec::new();
        }
        self.extract_mp4_subtitles(engine, &metadata).await
    }

    /// Feed the indexed boxes to `engine` and collect subtitle cues
    ///
    /// Never fails: an engine error or a failed range request ends the run
    /// and whatever was collected so far is returned.
    pub async fn extract_mp4_subtitles(
        &self,
        engine: &mut dyn DemuxEngine,
        metadata: &Mp4Metadata,
    ) -> Vec<SubtitleTrack> {
        let mut run = Extraction::new(engine, self.config.extraction_batch_size);
        run.signal(if metadata.is_empty() {
            Signal::IndexFailed
        } else {
            Signal::Indexed
        });

        let structural = metadata
            .atoms
            .iter()
            .filter(|atom| !atom.is_media_data() && !atom.is_free_space());
        let media_data = metadata.atoms.iter().filter(|atom| atom.is_media_data());

        for atom in structural.chain(media_data) {
            if run.state.is_terminal() {
                break;
            }
            if atom.is_media_data() {
                debug!(pos = atom.pos, size = atom.size, "Feeding media data box");
            }
            self.feed_atom(&mut run, atom).await;
        }

        run.signal(Signal::AtomsExhausted);

        let tracks = run.into_tracks();
        info!(
            url = %self.url,
            tracks = tracks.len(),
            cues = tracks.iter().map(|t| t.cues.len()).sum::<usize>(),
            "Subtitle extraction finished"
        );
        tracks
    }

    async fn feed_atom(&self, run: &mut Extraction<'_>, atom: &Atom) {
        let mut pos = atom.pos;
        let end = atom.end();

        while pos < end && !run.state.is_terminal() {
            let chunk = if run.state.is_extracting() {
                self.config.chunk_size
            } else {
                self.config.initial_chunk_size
            };
            let len = chunk.min(end - pos);

            let data = match self.fetch_range(pos, len).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(url = %self.url, pos, len, error = %e, "Range request failed, stopping extraction");
                    run.signal(Signal::FetchFailed);
                    return;
                }
            };

            let events = run.engine.append_buffer(data, pos);
            run.apply(events);
            pos += len;
        }
    }

    /// GET `len` bytes at `start`; anything but exactly `len` bytes is an error
    async fn fetch_range(&self, start: u64, len: u64) -> Result<Bytes> {
        if len == 0 {
            return Err(SubtitleError::Protocol(format!(
                "Empty range requested at {} of {}",
                start, self.url
            )));
        }
        let request = HttpRequest::get(&self.url).range(start, start + len - 1);
        let response = self.http.execute(request).await?.error_for_status(&self.url)?;

        let body = response.into_bytes();
        if body.len() as u64 != len {
            return Err(SubtitleError::Protocol(format!(
                "Range {}+{} of {} returned {} bytes",
                start,
                len,
                self.url,
                body.len()
            )));
        }
        Ok(body)
    }
}

/// State of one extraction run
struct Extraction<'e> {
    engine: &'e mut dyn DemuxEngine,
    batch_size: u32,
    state: ExtractionState,
    tracks: Vec<SubtitleTrack>,
}

impl<'e> Extraction<'e> {
    fn new(engine: &'e mut dyn DemuxEngine, batch_size: u32) -> Self {
        Self {
            engine,
            batch_size,
            state: ExtractionState::Indexing,
            tracks: Vec::new(),
        }
    }

    fn signal(&mut self, signal: Signal) {
        let next = self.state.next(signal);
        if next != self.state {
            trace!(from = ?self.state, to = ?next, ?signal, "Extraction state change");
        }
        self.state = next;
    }

    /// Apply engine reactions in order, including the ones triggered by `start`
    fn apply(&mut self, events: Vec<DemuxEvent>) {
        let mut queue: VecDeque<DemuxEvent> = events.into();

        while let Some(event) = queue.pop_front() {
            if self.state.is_terminal() {
                break;
            }

            match event {
                DemuxEvent::Ready(movie) => {
                    if self.state.is_extracting() {
                        continue;
                    }

                    let subtitle_tracks: Vec<SubtitleTrack> =
                        movie.subtitle_tracks().map(SubtitleTrack::from).collect();
                    debug!(
                        tracks = movie.tracks.len(),
                        subtitle_tracks = subtitle_tracks.len(),
                        "Movie header parsed"
                    );

                    if subtitle_tracks.is_empty() {
                        self.signal(Signal::Ready { has_subtitles: false });
                        continue;
                    }

                    for track in &subtitle_tracks {
                        self.engine.set_extraction_options(track.id, self.batch_size);
                    }
                    self.tracks = subtitle_tracks;
                    self.signal(Signal::Ready { has_subtitles: true });
                    queue.extend(self.engine.start());

                    // Tracks without samples are complete before any data arrives
                    if self.tracks.iter().all(SubtitleTrack::is_complete) {
                        self.signal(Signal::AllTracksComplete);
                    }
                }
                DemuxEvent::Samples { track_id, samples } => {
                    self.collect(track_id, &samples);
                    if self.tracks.iter().all(SubtitleTrack::is_complete) {
                        self.signal(Signal::AllTracksComplete);
                    }
                }
                DemuxEvent::Error(message) => {
                    warn!(%message, "Demux engine error");
                    self.signal(Signal::EngineError);
                }
                DemuxEvent::Finished => self.signal(Signal::Finished),
            }
        }
    }

    fn collect(&mut self, track_id: u32, samples: &[Sample]) {
        let Some(track) = self.tracks.iter_mut().find(|track| track.id == track_id) else {
            trace!(track_id, "Samples for a track that is not being extracted");
            return;
        };

        for sample in samples {
            track.cues.push(Cue::from_sample(sample, track.timescale));
        }

        if let Some(last) = samples.last() {
            self.engine.release_used_samples(track_id, last.number);
        }
    }

    fn into_tracks(self) -> Vec<SubtitleTrack> {
        self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlna_transport::testing::MockHttpClient;
    use dlna_transport::Method;

    const URL: &str = "http://192.168.1.20:8200/MediaItems/22.mp4";

    fn boxed(tag: &[u8; 4], size: u32) -> Vec<u8> {
        let mut data = size.to_be_bytes().to_vec();
        data.extend_from_slice(tag);
        data.resize(size as usize, 0);
        data
    }

    fn extractor(file: Vec<u8>) -> (SubtitleExtractor, Arc<MockHttpClient>) {
        let http = Arc::new(MockHttpClient::new());
        http.serve_file(URL, file);
        (SubtitleExtractor::new(URL, http.clone()), http)
    }

    #[tokio::test]
    async fn test_index_probes_one_header_per_box() {
        let mut file = boxed(b"ftyp", 24);
        file.extend(boxed(b"moov", 200));
        file.extend(boxed(b"free", 8));
        let (extractor, http) = extractor(file);

        let metadata = extractor.get_mp4_metadata().await.unwrap();
        let types: Vec<&str> = metadata.atoms.iter().map(|a| a.atom_type.as_str()).collect();
        assert_eq!(types, vec!["ftyp", "moov", "free"]);
        assert_eq!(metadata.size, 232);

        let ranges: Vec<String> = http
            .requests()
            .iter()
            .filter_map(|r| r.header_value("range").map(str::to_string))
            .collect();
        // The last probe is clamped to the end of the file
        assert_eq!(ranges, vec!["bytes=0-15", "bytes=24-39", "bytes=224-231"]);
    }

    #[tokio::test]
    async fn test_extended_size_box() {
        let mut file = boxed(b"ftyp", 16);
        let mut mdat = 1u32.to_be_bytes().to_vec();
        mdat.extend_from_slice(b"mdat");
        mdat.extend_from_slice(&40u64.to_be_bytes());
        mdat.resize(40, 0);
        file.extend(mdat);
        let (extractor, _http) = extractor(file);

        let metadata = extractor.get_mp4_metadata().await.unwrap();
        assert_eq!(metadata.atoms[1].size, 40);
        assert_eq!(metadata.atoms[1].pos, 16);
        assert_eq!(metadata.size, 56);
    }

    #[tokio::test]
    async fn test_box_past_end_of_file_is_not_mp4() {
        let mut file = boxed(b"ftyp", 24);
        file.extend_from_slice(&500u32.to_be_bytes());
        file.extend_from_slice(b"moov");
        file.resize(64, 0);
        let (extractor, _http) = extractor(file);

        assert!(matches!(
            extractor.get_mp4_metadata().await,
            Err(SubtitleError::NotMp4 { pos: 24, .. })
        ));
        assert!(extractor.index_atoms_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_network_error() {
        let http = Arc::new(MockHttpClient::new());
        let extractor = SubtitleExtractor::new(URL, http.clone());
        assert!(matches!(
            extractor.get_mp4_metadata().await,
            Err(SubtitleError::Network(_))
        ));
        assert_eq!(http.count(Method::Get, URL), 0);
    }

    #[tokio::test]
    async fn test_missing_content_length_is_protocol_error() {
        let http = Arc::new(MockHttpClient::new());
        http.route(Method::Head, URL, 200, Bytes::new());
        let extractor = SubtitleExtractor::new(URL, http);
        assert!(matches!(
            extractor.get_mp4_metadata().await,
            Err(SubtitleError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_file_is_not_mp4() {
        let (extractor, _http) = extractor(Vec::new());
        assert!(matches!(
            extractor.get_mp4_metadata().await,
            Err(SubtitleError::NotMp4 { pos: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let http = Arc::new(MockHttpClient::new());
        let no_probe = SubtitleConfig {
            header_probe_size: 0,
            ..SubtitleConfig::default()
        };
        assert!(matches!(
            SubtitleExtractor::with_config(URL, http.clone(), no_probe),
            Err(SubtitleError::Protocol(_))
        ));
        assert!(SubtitleExtractor::with_config(
            URL,
            http.clone(),
            SubtitleConfig::default().with_chunk_sizes(0, 0)
        )
        .is_err());
        assert!(SubtitleExtractor::with_config(URL, http, SubtitleConfig::low_memory()).is_ok());
    }

    #[tokio::test]
    async fn test_empty_range_is_not_requested() {
        let (extractor, http) = extractor(boxed(b"ftyp", 24));
        assert!(matches!(
            extractor.fetch_range(0, 0).await,
            Err(SubtitleError::Protocol(_))
        ));
        assert!(http.requests().is_empty());
    }
}
