use crate::{
    artifact::AudioArtifact,
    constants::LOCAL_SYNTHESIS_TIMEOUT,
    error::{Error, Result},
    synth::{EngineError, SpeechEngine, SpeechSettings, Utterance},
};
use std::sync::Arc;
use std::time::Duration;

/// Fallback backend. The speech engine speaks live and never hands back
/// encoded bytes, so success means a `LiveSynthesis` artifact.
pub struct LocalSynthesis {
    engine: Arc<dyn SpeechEngine>,
    speech: SpeechSettings,
    timeout: Duration,
}

impl LocalSynthesis {
    pub fn new(engine: Arc<dyn SpeechEngine>, speech: SpeechSettings) -> Self {
        LocalSynthesis {
            engine,
            speech,
            timeout: LOCAL_SYNTHESIS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    pub async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        if !self.engine.is_available() {
            return Err(Error::SynthesisUnsupported);
        }

        let utterance = Utterance::new(text, &self.speech);

        match tokio::time::timeout(self.timeout, self.engine.prepare(&utterance)).await {
            Ok(Ok(())) => {
                let artifact = AudioArtifact::live(text);
                info!(
                    "Local synthesis ready, estimated {:.1}s",
                    artifact.estimated_duration_secs()
                );
                Ok(artifact)
            }
            Ok(Err(EngineError::Unavailable)) => Err(Error::SynthesisUnsupported),
            Ok(Err(e)) => Err(Error::GenerationFailed(e.to_string())),
            Err(_) => {
                warn!(
                    "Local synthesis did not settle within {}s, cancelling",
                    self.timeout.as_secs()
                );
                self.engine.cancel();
                Err(Error::GenerationTimeout)
            }
        }
    }
}
