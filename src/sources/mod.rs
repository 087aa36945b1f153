//! Audio source adapters.
//!
//! An artifact with encoded bytes becomes a `BufferedSource` (decoded into
//! memory, exact seeking, real duration). A live synthesis artifact becomes
//! a `LiveSynthesisSource` driving the speech engine with a simulated clock.
//! Callers only ever see `AudioSourceAdapter` and its shared operations.

pub mod buffered;
pub mod live;

use crate::{
    artifact::AudioArtifact,
    error::{Error, Result},
    output::OutputSink,
    synth::{SpeechEngine, SpeechSettings},
};
use buffered::BufferedSource;
use live::LiveSynthesisSource;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// A stereo sample pair (left, right) as 16-bit signed integers.
pub type Sample = (i16, i16);

pub type SourceId = u64;

/// Counts playback passes within one source. Bumped whenever the source
/// starts, stops or jumps, so events queued by an earlier pass can be told
/// apart from the current one.
pub type PassId = u64;

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEventKind {
    /// Playback position moved
    TimeUpdate { position: f64 },

    /// Playback reached the end, sent once per playback pass
    Ended,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceEvent {
    pub source_id: SourceId,
    pub pass: PassId,
    pub kind: SourceEventKind,
}

/// Channel half a source reports its time updates and end of playback on.
#[derive(Clone, Debug)]
pub struct SourceEventSender {
    source_id: SourceId,
    pass: PassId,
    tx: mpsc::UnboundedSender<SourceEvent>,
}

impl SourceEventSender {
    pub fn new(source_id: SourceId, tx: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self {
            source_id,
            pass: 0,
            tx,
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Sender whose events are stamped with `pass`.
    pub fn for_pass(&self, pass: PassId) -> Self {
        Self {
            pass,
            ..self.clone()
        }
    }

    pub fn time_update(&self, position: f64) {
        self.send(SourceEventKind::TimeUpdate { position });
    }

    pub fn ended(&self) {
        self.send(SourceEventKind::Ended);
    }

    fn send(&self, kind: SourceEventKind) {
        let event = SourceEvent {
            source_id: self.source_id,
            pass: self.pass,
            kind,
        };

        // Receiver gone means the controller is shutting down
        if self.tx.send(event).is_err() {
            trace!("Source {} event dropped, no listener", self.source_id);
        }
    }
}

/// Everything a source needs from its environment.
#[derive(Clone)]
pub struct SourceContext {
    pub engine: Arc<dyn SpeechEngine>,
    pub speech: SpeechSettings,
    pub output: OutputSink,
}

/// What the active source can do, for UI affordances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub exact_seek: bool,
    pub true_duration: bool,
}

pub enum AudioSourceAdapter {
    Buffered(BufferedSource),
    Live(LiveSynthesisSource),
}

impl AudioSourceAdapter {
    /// Wraps `artifact` in the matching source. Time updates and the ended
    /// notification of every playback pass are delivered to `events`.
    pub fn load(
        artifact: &AudioArtifact,
        ctx: &SourceContext,
        events: SourceEventSender,
    ) -> Result<Self> {
        match artifact.bytes() {
            Some(bytes) => {
                let source =
                    BufferedSource::load(bytes, artifact.mime_kind(), ctx.output.clone(), events)?;
                Ok(AudioSourceAdapter::Buffered(source))
            }
            None => Ok(AudioSourceAdapter::Live(LiveSynthesisSource::load(
                artifact,
                ctx.engine.clone(),
                &ctx.speech,
                events,
            ))),
        }
    }

    pub fn id(&self) -> SourceId {
        match self {
            AudioSourceAdapter::Buffered(source) => source.id(),
            AudioSourceAdapter::Live(source) => source.id(),
        }
    }

    /// Pass the source is currently in, events from other passes are stale.
    pub fn pass(&self) -> PassId {
        match self {
            AudioSourceAdapter::Buffered(source) => source.pass(),
            AudioSourceAdapter::Live(source) => source.pass(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            AudioSourceAdapter::Buffered(_) => Capabilities {
                exact_seek: true,
                true_duration: true,
            },
            AudioSourceAdapter::Live(_) => Capabilities {
                exact_seek: false,
                true_duration: false,
            },
        }
    }

    /// Starts playback from the beginning.
    pub fn play(&mut self) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.play(),
            AudioSourceAdapter::Live(source) => source.play(),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.pause(),
            AudioSourceAdapter::Live(source) => source.pause(),
        }
    }

    pub fn resume(&mut self) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.resume(),
            AudioSourceAdapter::Live(source) => source.resume(),
        }
    }

    /// Halts playback and rewinds to the start.
    pub fn stop(&mut self) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.stop(),
            AudioSourceAdapter::Live(source) => source.stop(),
        }
    }

    /// Moves to `seconds`, clamped to `[0, duration]`.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.seek(seconds),
            AudioSourceAdapter::Live(source) => source.seek(seconds),
        }
    }

    pub fn current_time(&self) -> Result<f64> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.current_time(),
            AudioSourceAdapter::Live(source) => source.current_time(),
        }
    }

    pub fn duration(&self) -> Result<f64> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.duration(),
            AudioSourceAdapter::Live(source) => source.duration(),
        }
    }

    /// Tears the source down. Every later call fails with `AdapterDisposed`.
    pub fn dispose(&mut self) -> Result<()> {
        match self {
            AudioSourceAdapter::Buffered(source) => source.dispose(),
            AudioSourceAdapter::Live(source) => source.dispose(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            AudioSourceAdapter::Buffered(source) => source.is_disposed(),
            AudioSourceAdapter::Live(source) => source.is_disposed(),
        }
    }
}

/// Clamps a requested position into `[0, duration]`; NaN maps to 0.
pub fn clamp_position(seconds: f64, duration: f64) -> f64 {
    if seconds.is_nan() {
        return 0.0;
    }
    seconds.clamp(0.0, duration.max(0.0))
}

pub(crate) fn ensure_not_disposed(disposed: bool) -> Result<()> {
    if disposed {
        return Err(Error::AdapterDisposed);
    }
    Ok(())
}

pub(crate) trait PoisonlessLock<T> {
    fn plock(&self) -> MutexGuard<'_, T>;
}

impl<T> PoisonlessLock<T> for Mutex<T> {
    fn plock(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(l) => l,
            Err(e) => e.into_inner(),
        }
    }
}
