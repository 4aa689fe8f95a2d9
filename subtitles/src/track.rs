//! Extracted subtitle tracks

use serde::{Deserialize, Serialize};

use crate::demux::{Sample, TrackInfo};

/// One timed subtitle line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Seconds from the start of the movie
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    /// Decode a text sample: a 2-byte length prefix, then UTF-8 text
    pub fn from_sample(sample: &Sample, track_timescale: u32) -> Self {
        let timescale = match sample.timescale {
            0 => track_timescale,
            timescale => timescale,
        };
        let seconds = |ticks: u64| {
            if timescale == 0 {
                0.0
            } else {
                ticks as f64 / timescale as f64
            }
        };

        let payload = sample.data.get(2..).unwrap_or_default();

        Self {
            start: seconds(sample.dts),
            end: seconds(sample.dts.saturating_add(u64::from(sample.duration))),
            text: String::from_utf8_lossy(payload).into_owned(),
        }
    }
}

/// A subtitle track and the cues collected for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub id: u32,
    /// Sample count declared in the movie header
    pub sample_count: u32,
    pub timescale: u32,
    pub language: Option<String>,
    pub codec: Option<String>,
    pub cues: Vec<Cue>,
}

impl SubtitleTrack {
    pub fn is_complete(&self) -> bool {
        self.cues.len() >= self.sample_count as usize
    }
}

impl From<&TrackInfo> for SubtitleTrack {
    fn from(info: &TrackInfo) -> Self {
        Self {
            id: info.id,
            sample_count: info.sample_count,
            timescale: info.timescale,
            language: info.language.clone(),
            codec: info.codec.clone(),
            cues: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sample(dts: u64, duration: u32, timescale: u32, payload: &[u8]) -> Sample {
        Sample {
            number: 0,
            dts,
            duration,
            timescale,
            data: Bytes::copy_from_slice(payload),
        }
    }

    #[test]
    fn test_cue_skips_length_prefix() {
        let cue = Cue::from_sample(&sample(1500, 2500, 1000, b"\x00\x05Hello"), 1000);
        assert_eq!(cue.start, 1.5);
        assert_eq!(cue.end, 4.0);
        assert_eq!(cue.text, "Hello");
    }

    #[test]
    fn test_cue_end_saturates_at_last_tick() {
        let cue = Cue::from_sample(&sample(u64::MAX, 10, 1000, b"\x00\x01x"), 1000);
        assert_eq!(cue.end, cue.start);
        assert_eq!(cue.text, "x");
    }

    #[test]
    fn test_cue_decodes_multibyte_text() {
        let mut payload = vec![0x00, 0x06];
        payload.extend_from_slice("Ça va".as_bytes());
        let cue = Cue::from_sample(&sample(0, 600, 600, &payload), 600);
        assert_eq!(cue.text, "Ça va");
        assert_eq!(cue.end, 1.0);
    }

    #[test]
    fn test_cue_timescale_fallbacks() {
        let cue = Cue::from_sample(&sample(90_000, 45_000, 0, b"\x00\x00"), 90_000);
        assert_eq!(cue.start, 1.0);
        assert_eq!(cue.end, 1.5);
        assert_eq!(cue.text, "");

        let cue = Cue::from_sample(&sample(10, 10, 0, b"x"), 0);
        assert_eq!(cue.start, 0.0);
        assert_eq!(cue.text, "");
    }
}
