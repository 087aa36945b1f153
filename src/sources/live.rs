//! Live speech synthesis behind the source interface.
//!
//! The engine offers no position or timeupdate, so progress comes from a
//! virtual clock advanced every 100 ms by a ticker task. Duration is the
//! artifact's estimate. The engine cannot start mid-utterance: seeking while
//! playing cancels and speaks again from the top while the clock reports the
//! requested position.

use super::{
    clamp_position, ensure_not_disposed, PassId, PoisonlessLock, SourceEventSender, SourceId,
};
use crate::{
    artifact::AudioArtifact,
    constants::LIVE_TICK_INTERVAL,
    error::{Error, Result},
    synth::{EngineError, EngineEvent, EngineEventRx, SpeechEngine, SpeechSettings, Utterance},
};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Stopped,
    Speaking,
    Paused,
}

pub struct LiveSynthesisSource {
    utterance: Utterance,
    duration: f64,
    engine: Arc<dyn SpeechEngine>,
    events: SourceEventSender,

    /// Virtual playback position in seconds
    clock: Arc<Mutex<f64>>,

    /// Lives as long as one utterance pass, owns the engine listener.
    /// The listener cancels it when the engine finishes the utterance.
    pass: Option<CancellationToken>,

    /// Stamped on every event of the current pass
    pass_id: PassId,

    /// Child of `pass`, stopped on pause
    ticker: Option<CancellationToken>,

    status: Status,

    /// Set when the engine no longer holds a resumable utterance
    restart_on_resume: bool,

    disposed: bool,
}

impl LiveSynthesisSource {
    pub fn load(
        artifact: &AudioArtifact,
        engine: Arc<dyn SpeechEngine>,
        speech: &SpeechSettings,
        events: SourceEventSender,
    ) -> Self {
        debug!(
            "Loaded live synthesis source {} (estimated {:.2}s)",
            events.source_id(),
            artifact.estimated_duration_secs()
        );

        LiveSynthesisSource {
            utterance: Utterance::new(artifact.source_text(), speech),
            duration: artifact.estimated_duration_secs(),
            engine,
            events,
            clock: Arc::new(Mutex::new(0.0)),
            pass: None,
            pass_id: 0,
            ticker: None,
            status: Status::Stopped,
            restart_on_resume: false,
            disposed: false,
        }
    }

    pub fn id(&self) -> SourceId {
        self.events.source_id()
    }

    pub fn pass(&self) -> PassId {
        self.pass_id
    }

    pub fn play(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        self.settle();
        self.halt();
        *self.clock.plock() = 0.0;
        self.speak_from_top()
    }

    /// Pauses the engine. Engines that cannot pause have their utterance
    /// cancelled, and the next resume speaks it again from the top.
    pub fn pause(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;
        self.settle();

        if self.status != Status::Speaking {
            return Ok(());
        }

        self.stop_ticker();
        if let Err(e) = self.engine.pause() {
            warn!("Speech engine cannot pause ({e}), cancelling the utterance instead");
            self.engine.cancel();
            self.restart_on_resume = true;
        }
        self.status = Status::Paused;

        Ok(())
    }

    /// Continues a paused utterance. Fails with `ResumeUnsupported` when the
    /// engine cannot resume; the source then stays paused.
    pub fn resume(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;
        self.settle();

        if self.status != Status::Paused {
            return Ok(());
        }

        if self.restart_on_resume {
            return self.speak_from_top();
        }

        match self.engine.resume() {
            Ok(()) => {
                self.status = Status::Speaking;
                self.start_ticker();
                Ok(())
            }
            Err(EngineError::Unsupported(_)) => {
                warn!(
                    "Speech engine cannot resume source {}, press play to start over",
                    self.id()
                );
                Err(Error::ResumeUnsupported)
            }
            Err(EngineError::Unavailable) => Err(Error::SynthesisUnsupported),
            Err(e) => Err(Error::GenerationFailed(e.to_string())),
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        self.settle();
        self.halt();
        *self.clock.plock() = 0.0;

        Ok(())
    }

    /// Clamps the requested position for display. Audio before the seek
    /// point is lost: a playing utterance restarts from its beginning.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        ensure_not_disposed(self.disposed)?;

        let target = clamp_position(seconds, self.duration);
        self.settle();

        match self.status {
            Status::Speaking => {
                self.halt();
                *self.clock.plock() = target;
                self.speak_from_top()?;
            }
            Status::Paused => {
                self.engine.cancel();
                self.restart_on_resume = true;
                self.pass_id += 1;
                *self.clock.plock() = target;
            }
            Status::Stopped => {
                self.pass_id += 1;
                *self.clock.plock() = target;
            }
        }

        Ok(())
    }

    pub fn current_time(&self) -> Result<f64> {
        ensure_not_disposed(self.disposed)?;
        Ok(*self.clock.plock())
    }

    pub fn duration(&self) -> Result<f64> {
        ensure_not_disposed(self.disposed)?;
        Ok(self.duration)
    }

    pub fn dispose(&mut self) -> Result<()> {
        ensure_not_disposed(self.disposed)?;
        self.teardown();
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn teardown(&mut self) {
        self.halt();
        self.disposed = true;
        debug!("Disposed live synthesis source {}", self.id());
    }

    /// Cancels the engine, the listener and the ticker, leaving the clock
    /// untouched.
    fn halt(&mut self) {
        self.stop_ticker();
        if let Some(pass) = self.pass.take() {
            pass.cancel();
        }
        if self.status != Status::Stopped {
            self.engine.cancel();
        }
        self.status = Status::Stopped;
        self.restart_on_resume = false;
        self.pass_id += 1;
    }

    /// Notices a pass the engine already finished on its own. Only the
    /// listener cancels a pass token that is still held here.
    fn settle(&mut self) {
        let finished = self.pass.as_ref().is_some_and(|pass| pass.is_cancelled());
        if !finished {
            return;
        }

        trace!("Utterance of source {} already finished", self.id());
        self.stop_ticker();
        self.pass = None;
        self.status = Status::Stopped;
        self.restart_on_resume = false;
    }

    fn speak_from_top(&mut self) -> Result<()> {
        if let Some(pass) = self.pass.take() {
            pass.cancel();
        }

        let (tx, rx) = mpsc::unbounded_channel();

        self.engine.speak(&self.utterance, tx).map_err(|e| match e {
            EngineError::Unavailable => Error::SynthesisUnsupported,
            e => Error::GenerationFailed(e.to_string()),
        })?;

        let pass = CancellationToken::new();
        self.pass = Some(pass.clone());
        self.pass_id += 1;
        spawn_engine_listener(pass, rx, self.events.for_pass(self.pass_id));

        self.status = Status::Speaking;
        self.restart_on_resume = false;
        self.start_ticker();

        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(token) = self.ticker.take() {
            token.cancel();
        }
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();

        let Some(pass) = &self.pass else {
            return;
        };

        let token = pass.child_token();
        self.ticker = Some(token.clone());

        let clock = self.clock.clone();
        let events = self.events.for_pass(self.pass_id);
        let duration = self.duration;
        let step = LIVE_TICK_INTERVAL.as_secs_f64();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + LIVE_TICK_INTERVAL, LIVE_TICK_INTERVAL);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let position = {
                            let mut clock = clock.plock();
                            *clock = (*clock + step).min(duration);
                            *clock
                        };
                        events.time_update(position);
                    }
                }
            }
        });
    }
}

/// Forwards the end of an utterance pass as the source's ended notification.
/// Cancelling `pass` silences it, so a cancelled utterance never ends a pass.
fn spawn_engine_listener(pass: CancellationToken, mut rx: EngineEventRx, events: SourceEventSender) {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                _ = pass.cancelled() => return,
                event = rx.recv() => event,
            };

            match event {
                Some(EngineEvent::Started) => trace!("Speech engine started"),
                Some(EngineEvent::Finished) => break,
                Some(EngineEvent::Failed(reason)) => {
                    error!("Speech engine failed mid-utterance: {reason}");
                    break;
                }
                // Engine let go of a cancelled utterance
                None => return,
            }
        }

        // Stops the ticker too
        pass.cancel();
        events.ended();
    });
}

impl Drop for LiveSynthesisSource {
    fn drop(&mut self) {
        if !self.disposed {
            self.teardown();
        }
    }
}
