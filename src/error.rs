//! Error taxonomy shared by every component.
//!
//! Backend plumbing uses `anyhow` internally; anything that crosses a
//! component boundary is folded into one of these variants.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Uploaded file exceeds the input size cap.
    #[error("File is too large ({size} bytes), the limit is {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("Enter some text to convert")]
    EmptyText,

    #[error("Failed to read file: {0}")]
    FileReadFailed(String),

    /// Both the cloud and the local backend failed.
    #[error("Audio generation failed: {0}")]
    GenerationFailed(String),

    /// The local synthesis fallback did not settle in time.
    #[error("Local speech synthesis timed out")]
    GenerationTimeout,

    /// A generation request is already in flight.
    #[error("Audio generation already in progress")]
    GenerationBusy,

    #[error("Speech synthesis is not supported in this environment")]
    SynthesisUnsupported,

    /// Operation on an adapter after it was torn down.
    #[error("Audio source has been disposed")]
    AdapterDisposed,

    /// The speech engine cannot continue a paused utterance.
    #[error("The speech engine cannot resume a paused utterance")]
    ResumeUnsupported,

    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    #[error("No audio loaded")]
    NoArtifactLoaded,

    #[error("No recent item with id {0}")]
    ItemNotFound(String),

    /// Durable storage is not usable, the store keeps working in memory.
    #[error("Persistent storage unavailable: {0}")]
    PersistenceUnavailable(String),
}
