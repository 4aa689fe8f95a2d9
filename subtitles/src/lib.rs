//! Subtitle extraction from remote MP4 files
//!
//! The file is never downloaded as a whole. Its top-level boxes are indexed
//! with ranged requests, then fed to a [`DemuxEngine`] one bounded chunk at a
//! time until every subtitle track has produced its samples.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlna_subtitles::{DemuxEngine, SubtitleExtractor};
//! use dlna_transport::ReqwestHttpClient;
//!
//! # async fn run(engine: &mut dyn DemuxEngine) -> Result<(), Box<dyn std::error::Error>> {
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let extractor = SubtitleExtractor::new("http://192.168.1.20:8200/MediaItems/22.mp4", http);
//!
//! for track in extractor.extract_subtitles(engine).await {
//!     println!("track {} ({:?}): {} cues", track.id, track.language, track.cues.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod atom;
mod config;
pub mod demux;
mod error;
mod extractor;
pub mod state;
mod track;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use atom::{parse_atom_header, Atom, Mp4Metadata};
pub use config::SubtitleConfig;
pub use demux::{DemuxEngine, DemuxEvent, MovieInfo, Sample, TrackInfo, TrackKind};
pub use error::{Result, SubtitleError};
pub use extractor::SubtitleExtractor;
pub use state::{ExtractionState, Signal};
pub use track::{Cue, SubtitleTrack};
