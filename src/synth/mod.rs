//! Local speech synthesis capability.
//!
//! A `SpeechEngine` speaks an utterance live; it never yields encoded audio.
//! Engines report progress through `EngineEvent`s on the channel handed to
//! `speak`, and whether they can pause and resume is engine specific.

#[cfg(feature = "espeak")]
pub mod espeak;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No speech synthesis in this environment
    #[error("speech synthesis unavailable")]
    Unavailable,

    /// Engine lacks the requested capability (e.g. resuming a paused utterance)
    #[error("operation not supported by this speech engine: {0}")]
    Unsupported(&'static str),

    #[error("speech engine failure: {0}")]
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// Voice parameters applied to every utterance.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,

    /// Preferred voice name, otherwise the first Japanese voice is used
    pub voice: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        SpeechSettings {
            lang: "ja-JP".to_string(),
            rate: 0.8,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<String>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, settings: &SpeechSettings) -> Self {
        Utterance {
            text: text.into(),
            lang: settings.lang.clone(),
            rate: settings.rate,
            pitch: settings.pitch,
            volume: settings.volume,
            voice: settings.voice.clone(),
        }
    }
}

/// First voice whose language tag mentions Japanese.
pub fn select_japanese_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|voice| voice.lang.contains("ja") || voice.lang.contains("JP"))
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Started,
    Finished,
    Failed(String),
}

pub type EngineEventTx = mpsc::UnboundedSender<EngineEvent>;
pub type EngineEventRx = mpsc::UnboundedReceiver<EngineEvent>;

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Capability check, `false` means only the cloud backend is usable.
    fn is_available(&self) -> bool;

    async fn voices(&self) -> Result<Vec<Voice>, EngineError>;

    /// Gets the engine ready to speak `utterance`. Engines that load their
    /// voice list lazily may take a while here.
    async fn prepare(&self, utterance: &Utterance) -> Result<(), EngineError> {
        if !self.is_available() {
            return Err(EngineError::Unavailable);
        }

        let voices = self.voices().await?;
        match &utterance.voice {
            Some(name) if voices.iter().any(|voice| &voice.name == name) => {}
            _ => match select_japanese_voice(&voices) {
                Some(voice) => debug!("Using voice {} ({})", voice.name, voice.lang),
                None => warn!("No Japanese voice installed, using the engine default"),
            },
        }

        Ok(())
    }

    /// Starts speaking from the beginning. Progress arrives on `events`;
    /// `Finished` is sent once when the utterance completes on its own.
    fn speak(&self, utterance: &Utterance, events: EngineEventTx) -> Result<(), EngineError>;

    fn pause(&self) -> Result<(), EngineError>;

    fn resume(&self) -> Result<(), EngineError>;

    /// Stops the current utterance without sending `Finished`.
    fn cancel(&self);
}

/// Engine used when the environment has no speech synthesis.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableEngine;

#[async_trait]
impl SpeechEngine for UnavailableEngine {
    fn is_available(&self) -> bool {
        false
    }

    async fn voices(&self) -> Result<Vec<Voice>, EngineError> {
        Err(EngineError::Unavailable)
    }

    fn speak(&self, _utterance: &Utterance, _events: EngineEventTx) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    fn pause(&self) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    fn resume(&self) -> Result<(), EngineError> {
        Err(EngineError::Unavailable)
    }

    fn cancel(&self) {}
}

/// The best engine this build offers.
pub fn default_engine() -> std::sync::Arc<dyn SpeechEngine> {
    #[cfg(feature = "espeak")]
    {
        std::sync::Arc::new(espeak::EspeakEngine::new())
    }

    #[cfg(not(feature = "espeak"))]
    {
        std::sync::Arc::new(UnavailableEngine)
    }
}
