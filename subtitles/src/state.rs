//! Extraction state machine
//!
//! Engine reactions and fetch outcomes are turned into [`Signal`]s and applied
//! through [`ExtractionState::next`]. `Done` and `Failed` absorb every signal.

/// Progress of one extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    Indexing,
    AwaitingReady,
    Extracting,
    Done,
    Failed,
}

/// Inputs of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The atom list is available
    Indexed,
    /// The atom list could not be built
    IndexFailed,
    /// The engine parsed the movie header
    Ready { has_subtitles: bool },
    /// Every subtitle track reached its declared sample count
    AllTracksComplete,
    /// The engine has nothing pending
    Finished,
    EngineError,
    /// A range request failed or came back short
    FetchFailed,
    /// Every atom worth feeding has been fed
    AtomsExhausted,
}

impl ExtractionState {
    pub fn next(self, signal: Signal) -> ExtractionState {
        use ExtractionState::*;

        match (self, signal) {
            (Done, _) | (Failed, _) => self,

            (Indexing, Signal::Indexed) => AwaitingReady,
            (Indexing, Signal::IndexFailed) => Failed,

            (AwaitingReady, Signal::Ready { has_subtitles: true }) => Extracting,
            (AwaitingReady, Signal::Ready { has_subtitles: false }) => Done,
            (AwaitingReady, Signal::Finished) => Done,
            (AwaitingReady, Signal::EngineError | Signal::FetchFailed | Signal::AtomsExhausted) => Failed,

            (Extracting, Signal::AllTracksComplete | Signal::Finished | Signal::AtomsExhausted) => Done,
            (Extracting, Signal::EngineError | Signal::FetchFailed) => Failed,

            (state, _) => state,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExtractionState::Done | ExtractionState::Failed)
    }

    /// True once subtitle tracks are known and their samples are being collected
    pub fn is_extracting(self) -> bool {
        self == ExtractionState::Extracting
    }
}
