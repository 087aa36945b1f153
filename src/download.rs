//! Download boundary: turns the current artifact into a named file.

use crate::artifact::{AudioArtifact, MimeKind};
use bytes::Bytes;
use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Clone, Debug, PartialEq)]
pub struct DownloadFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Bytes,
}

/// Builds the file offered for download. Encoded artifacts are handed out
/// as-is, live synthesis artifacts fall back to their source text.
pub fn prepare(artifact: &AudioArtifact, now: DateTime<Utc>) -> DownloadFile {
    let timestamp = now.format(TIMESTAMP_FORMAT);
    let kind = artifact.mime_kind();

    match artifact.bytes() {
        Some(bytes) => DownloadFile {
            file_name: format!("tts_audio_{timestamp}.{}", kind.extension()),
            mime: kind.mime_type(),
            bytes: bytes.clone(),
        },
        None => DownloadFile {
            file_name: format!(
                "tts_script_{timestamp}.{}",
                MimeKind::LiveSynthesis.extension()
            ),
            mime: MimeKind::LiveSynthesis.mime_type(),
            bytes: Bytes::from(artifact.source_text().to_string()),
        },
    }
}
