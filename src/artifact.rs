//! Normalized output of audio generation.

use crate::constants::{CHARS_PER_SECOND, MIN_ESTIMATED_DURATION_SECS};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    Mp3,
    Wav,
    /// Spoken live by a speech engine, no encoded bytes exist
    LiveSynthesis,
}

/// Encodings a synthesis backend can hand back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => Some(AudioFormat::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(AudioFormat::Wav),
            _ => None,
        }
    }
}

impl From<AudioFormat> for MimeKind {
    fn from(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Mp3 => MimeKind::Mp3,
            AudioFormat::Wav => MimeKind::Wav,
        }
    }
}

impl MimeKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            MimeKind::Mp3 => "audio/mpeg",
            MimeKind::Wav => "audio/wav",
            MimeKind::LiveSynthesis => "text/plain; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MimeKind::Mp3 => "mp3",
            MimeKind::Wav => "wav",
            MimeKind::LiveSynthesis => "txt",
        }
    }
}

/// Estimated speaking time of `text`, assuming a fixed characters-per-second
/// rate and never less than two seconds.
pub fn estimate_duration(text: &str) -> f64 {
    let chars = text.chars().count() as f64;
    (chars / CHARS_PER_SECOND).max(MIN_ESTIMATED_DURATION_SECS)
}

/// Audio produced for a piece of text.
///
/// Encoded artifacts (MP3/WAV) always carry bytes, live synthesis artifacts
/// never do. The constructors are the only way to build one.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioArtifact {
    bytes: Option<Bytes>,
    mime_kind: MimeKind,
    source_text: String,
    estimated_duration_secs: f64,
}

impl AudioArtifact {
    pub fn mp3(bytes: impl Into<Bytes>, source_text: impl Into<String>) -> Self {
        Self::encoded(bytes, AudioFormat::Mp3, source_text)
    }

    pub fn wav(bytes: impl Into<Bytes>, source_text: impl Into<String>) -> Self {
        Self::encoded(bytes, AudioFormat::Wav, source_text)
    }

    pub fn live(source_text: impl Into<String>) -> Self {
        let source_text = source_text.into();
        AudioArtifact {
            bytes: None,
            mime_kind: MimeKind::LiveSynthesis,
            estimated_duration_secs: estimate_duration(&source_text),
            source_text,
        }
    }

    pub fn encoded(
        bytes: impl Into<Bytes>,
        format: AudioFormat,
        source_text: impl Into<String>,
    ) -> Self {
        let source_text = source_text.into();
        AudioArtifact {
            bytes: Some(bytes.into()),
            mime_kind: format.into(),
            estimated_duration_secs: estimate_duration(&source_text),
            source_text,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    pub fn mime_kind(&self) -> MimeKind {
        self.mime_kind
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn estimated_duration_secs(&self) -> f64 {
        self.estimated_duration_secs
    }

    pub fn is_live(&self) -> bool {
        self.bytes.is_none()
    }
}
