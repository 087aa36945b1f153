//! HTTP text-to-speech service returning encoded audio.

use super::SynthesisBackend;
use crate::artifact::{AudioArtifact, AudioFormat};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_voice() -> String {
    "ja-JP".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CloudConfig {
    /// URL the synthesis request is POSTed to
    pub endpoint: String,

    /// Sent as a bearer token when set
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_voice")]
    pub voice: String,

    /// Requested encoding, also assumed when the response has no usable
    /// Content-Type
    #[serde(default)]
    pub format: AudioFormat,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CloudConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        CloudConfig {
            endpoint: endpoint.into(),
            api_key: None,
            voice: default_voice(),
            format: AudioFormat::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    format: AudioFormat,
}

pub struct CloudBackend {
    client: Client,
    config: CloudConfig,
}

impl CloudBackend {
    pub fn new(config: CloudConfig) -> Result<Self> {
        // rustls needs a process-wide crypto provider, the first install wins
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(CloudBackend { client, config })
    }
}

#[async_trait]
impl SynthesisBackend for CloudBackend {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let body = SynthesisRequest {
            text,
            voice: &self.config.voice,
            format: self.config.format,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.config.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Synthesis service responded with {status}");
        }

        let format = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(AudioFormat::from_content_type)
            .unwrap_or(self.config.format);

        let bytes = response
            .bytes()
            .await
            .context("Failed to read synthesis response body")?;

        if bytes.is_empty() {
            bail!("Synthesis service returned no audio");
        }

        debug!("Received {} bytes of {:?} audio", bytes.len(), format);

        Ok(AudioArtifact::encoded(bytes, format, text))
    }
}
