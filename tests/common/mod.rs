//! Test infrastructure for yomiage integration tests.
//!
//! Provides a scriptable speech engine, a canned synthesis backend, WAV
//! fixtures and helpers for driving a playback controller by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

pub use yomiage::artifact::{AudioArtifact, MimeKind};
pub use yomiage::error::Error;
pub use yomiage::event::{Event, EventBus, Subscriber};
pub use yomiage::generation::{local::LocalSynthesis, AudioGenerationService, SynthesisBackend};
pub use yomiage::playback::{PlaybackAction, PlaybackController, PlaybackState};
pub use yomiage::sources::{SourceContext, SourceEvent, SourceEventKind};
pub use yomiage::synth::{
    EngineError, EngineEvent, EngineEventTx, SpeechEngine, SpeechSettings, Utterance, Voice,
};

#[derive(Default)]
struct EngineLog {
    current: Option<EngineEventTx>,
    spoken: Vec<String>,
    cancels: usize,
    pauses: usize,
}

/// Speech engine driven by the test: utterances only finish when
/// `finish()` is called.
pub struct MockEngine {
    available: bool,
    can_pause: bool,
    can_resume: bool,
    hang_prepare: bool,
    log: Mutex<EngineLog>,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine {
            available: true,
            can_pause: true,
            can_resume: true,
            hang_prepare: false,
            log: Mutex::new(EngineLog::default()),
        }
    }

    pub fn unavailable() -> Self {
        MockEngine {
            available: false,
            ..Self::new()
        }
    }

    /// Pauses fine but cannot continue afterwards.
    pub fn without_resume() -> Self {
        MockEngine {
            can_resume: false,
            ..Self::new()
        }
    }

    /// Rejects pause outright.
    pub fn without_pause() -> Self {
        MockEngine {
            can_pause: false,
            ..Self::new()
        }
    }

    /// `prepare` never settles.
    pub fn hanging() -> Self {
        MockEngine {
            hang_prepare: true,
            ..Self::new()
        }
    }

    /// Completes the utterance being spoken.
    pub fn finish(&self) {
        if let Some(tx) = self.log.lock().unwrap().current.take() {
            let _ = tx.send(EngineEvent::Finished);
        }
    }

    /// Fails the utterance being spoken.
    pub fn fail(&self, reason: &str) {
        if let Some(tx) = self.log.lock().unwrap().current.take() {
            let _ = tx.send(EngineEvent::Failed(reason.to_string()));
        }
    }

    pub fn speak_count(&self) -> usize {
        self.log.lock().unwrap().spoken.len()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.log.lock().unwrap().spoken.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.log.lock().unwrap().cancels
    }

    pub fn pause_count(&self) -> usize {
        self.log.lock().unwrap().pauses
    }

    pub fn is_speaking(&self) -> bool {
        self.log.lock().unwrap().current.is_some()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEngine for MockEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn voices(&self) -> Result<Vec<Voice>, EngineError> {
        if !self.available {
            return Err(EngineError::Unavailable);
        }

        Ok(vec![
            Voice {
                name: "english".to_string(),
                lang: "en-US".to_string(),
            },
            Voice {
                name: "kyoko".to_string(),
                lang: "ja-JP".to_string(),
            },
        ])
    }

    async fn prepare(&self, _utterance: &Utterance) -> Result<(), EngineError> {
        if !self.available {
            return Err(EngineError::Unavailable);
        }
        if self.hang_prepare {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn speak(&self, utterance: &Utterance, events: EngineEventTx) -> Result<(), EngineError> {
        if !self.available {
            return Err(EngineError::Unavailable);
        }

        let _ = events.send(EngineEvent::Started);

        let mut log = self.log.lock().unwrap();
        log.spoken.push(utterance.text.clone());
        log.current = Some(events);

        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        if !self.can_pause {
            return Err(EngineError::Unsupported("pause"));
        }
        self.log.lock().unwrap().pauses += 1;
        Ok(())
    }

    fn resume(&self) -> Result<(), EngineError> {
        if !self.can_resume {
            return Err(EngineError::Unsupported("resume"));
        }
        Ok(())
    }

    fn cancel(&self) {
        let mut log = self.log.lock().unwrap();
        log.current = None;
        log.cancels += 1;
    }
}

pub enum MockReply {
    Wav(Vec<u8>),
    Fail(String),
}

/// Synthesis backend with a fixed reply that counts its calls.
pub struct MockBackend {
    reply: MockReply,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn wav(bytes: Vec<u8>) -> Self {
        MockBackend {
            reply: MockReply::Wav(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        MockBackend {
            reply: MockReply::Fail(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.reply {
            MockReply::Wav(bytes) => Ok(AudioArtifact::wav(bytes.clone(), text)),
            MockReply::Fail(reason) => anyhow::bail!("{reason}"),
        }
    }
}

/// 16-bit stereo WAV of `secs` seconds at `sample_rate`.
pub fn wav_bytes(secs: f64, sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..(secs * sample_rate as f64) as usize {
            let sample = ((i % 64) as i16 - 32) * 256;
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    cursor.into_inner()
}

pub fn source_context(engine: Arc<dyn SpeechEngine>) -> SourceContext {
    SourceContext {
        engine,
        speech: SpeechSettings::default(),
        output: yomiage::output::sink(),
    }
}

/// Controller with no bus listeners, driven through `pump_until`.
pub fn controller(
    engine: Arc<dyn SpeechEngine>,
) -> (PlaybackController, UnboundedReceiver<SourceEvent>) {
    PlaybackController::new(EventBus::new(), source_context(engine))
}

/// Feeds source events to `controller` until `done` holds.
pub async fn pump_until<F>(
    controller: &mut PlaybackController,
    rx: &mut UnboundedReceiver<SourceEvent>,
    done: F,
) where
    F: Fn(&PlaybackController) -> bool,
{
    while !done(controller) {
        let event = rx.recv().await.expect("source event channel closed");
        controller.handle_source_event(event);
    }
}

/// Feeds exactly one source event to `controller`.
pub async fn pump_one(controller: &mut PlaybackController, rx: &mut UnboundedReceiver<SourceEvent>) {
    let event = rx.recv().await.expect("source event channel closed");
    controller.handle_source_event(event);
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

/// Waits for the first event matching `matches`.
pub async fn wait_for_event<F>(subscriber: &mut Subscriber, matches: F) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    while let Some(event) = subscriber.recv().await {
        if matches(&event) {
            return Some(event);
        }
    }
    None
}
