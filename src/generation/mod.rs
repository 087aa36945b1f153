//! Text to audio, cloud first with a local speech fallback.
//!
//! The cloud backend yields encoded audio. When it is missing or fails, the
//! local speech engine is asked to get ready and a live synthesis artifact
//! is returned instead; the engine speaks it when the artifact is played.

pub mod cloud;
pub mod local;

use crate::{
    artifact::AudioArtifact,
    error::{Error, Result},
    event::{Event, EventBus},
    input::validate_text,
};
use async_trait::async_trait;
use local::LocalSynthesis;
use std::sync::Arc;
use tokio::sync::watch;

/// A backend producing encoded audio for a piece of text.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioArtifact>;
}

pub struct AudioGenerationService {
    primary: Option<Arc<dyn SynthesisBackend>>,
    local: LocalSynthesis,
    in_progress: watch::Sender<bool>,
    bus: Option<EventBus>,
}

impl AudioGenerationService {
    pub fn new(primary: Option<Arc<dyn SynthesisBackend>>, local: LocalSynthesis) -> Self {
        let (in_progress, _rx) = watch::channel(false);

        AudioGenerationService {
            primary,
            local,
            in_progress,
            bus: None,
        }
    }

    /// Also announce the in-progress flag as `Event::Generating` on `bus`.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Watch for the "generation in progress" flag.
    pub fn status(&self) -> watch::Receiver<bool> {
        self.in_progress.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        *self.in_progress.borrow()
    }

    /// Produces audio for `text`. Only one generation runs at a time, a
    /// second request fails with `GenerationBusy` until the first settles.
    pub async fn generate(&self, text: &str) -> Result<AudioArtifact> {
        let text = validate_text(text)?;
        let _guard = self.begin()?;

        let cloud_failure = match &self.primary {
            Some(backend) => match backend.synthesize(text).await {
                Ok(artifact) => {
                    info!(
                        "{} backend produced {:?} audio for {} chars",
                        backend.name(),
                        artifact.mime_kind(),
                        text.chars().count()
                    );
                    return Ok(artifact);
                }
                Err(e) => {
                    warn!(
                        "{} backend failed, falling back to local synthesis: {e:#}",
                        backend.name()
                    );
                    format!("{}: {e:#}", backend.name())
                }
            },
            None => {
                debug!("No cloud backend configured, using local synthesis");
                "cloud backend not configured".to_string()
            }
        };

        match self.local.synthesize(text).await {
            Ok(artifact) => Ok(artifact),
            Err(Error::GenerationTimeout) => Err(Error::GenerationTimeout),
            Err(e) => {
                error!("Local synthesis failed too: {e}");
                Err(Error::GenerationFailed(format!(
                    "{cloud_failure}; local synthesis: {e}"
                )))
            }
        }
    }

    fn begin(&self) -> Result<InProgress<'_>> {
        let started = self.in_progress.send_if_modified(|busy| {
            if *busy {
                return false;
            }
            *busy = true;
            true
        });

        if !started {
            return Err(Error::GenerationBusy);
        }

        if let Some(bus) = &self.bus {
            bus.send(Event::Generating(true));
        }

        Ok(InProgress { service: self })
    }
}

/// Clears the in-progress flag however the generation settles.
struct InProgress<'a> {
    service: &'a AudioGenerationService,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.service.in_progress.send_replace(false);

        if let Some(bus) = &self.service.bus {
            bus.send(Event::Generating(false));
        }
    }
}
