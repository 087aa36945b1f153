//! Playback controller: owns the single active audio source and the
//! transport state machine.
//!
//! ```text
//! Idle --load--> Ready --play--> Playing <--pause/resume--> Paused
//!                  ^                |  \                       |
//!                  +------stop------+   +--ended--> Ended      |
//!                  +-------------------stop--------------------+
//! ```
//!
//! Loading a new artifact from any state tears the previous source down
//! first and lands in `Ready`. `play` from `Ended` starts over from 0.

use crate::{
    artifact::AudioArtifact,
    download::{self, DownloadFile},
    error::{Error, Result},
    event::{Event, EventBus},
    sources::{
        AudioSourceAdapter, Capabilities, SourceContext, SourceEvent, SourceEventKind,
        SourceEventSender, SourceId,
    },
};
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

pub type SharedPlayback = Arc<RwLock<PlaybackController>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing loaded
    Idle,

    /// Artifact loaded, not played yet (or stopped)
    Ready,

    Playing,
    Paused,

    /// Reached the end, the next play starts over
    Ended,
}

impl Display for PlaybackState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Ended => "ended",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
pub enum PlaybackAction {
    /// Start from the beginning
    Play,
    Pause,
    Resume,
    TogglePlayPause,
    Stop,

    /// Jump to an absolute position in seconds
    Seek { position: f64 },

    /// Jump relative to the current position
    SeekBy { delta: f64 },

    /// Replace whatever is loaded
    Load(Arc<AudioArtifact>),
}

/// Formats seconds as zero-padded `mm:ss`, truncating fractions.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }

    let total = seconds.trunc() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `current / duration` as a percentage, 0 when the duration is unknown.
pub fn progress_percent(current: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    (current / duration * 100.0).clamp(0.0, 100.0)
}

/// What a progress bar shows.
#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    pub current_time: f64,
    pub duration: f64,
    pub percent: f64,
    pub current_label: String,
    pub total_label: String,
}

impl Progress {
    pub fn new(current_time: f64, duration: f64) -> Self {
        Progress {
            current_time,
            duration,
            percent: progress_percent(current_time, duration),
            current_label: format_time(current_time),
            total_label: format_time(duration),
        }
    }
}

impl Display for Progress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} ({:.0}%)",
            self.current_label, self.total_label, self.percent
        )
    }
}

struct ActiveItem {
    artifact: Arc<AudioArtifact>,
    source: AudioSourceAdapter,
}

pub struct PlaybackController {
    bus: EventBus,
    ctx: SourceContext,
    events_tx: mpsc::UnboundedSender<SourceEvent>,
    next_source_id: SourceId,
    active: Option<ActiveItem>,
    state: PlaybackState,

    /// Position shown to the user, in seconds
    position: f64,
}

impl PlaybackController {
    /// Creates an idle controller. Source events for it arrive on the
    /// returned receiver and must be fed to `handle_source_event`.
    pub fn new(
        bus: EventBus,
        ctx: SourceContext,
    ) -> (Self, mpsc::UnboundedReceiver<SourceEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let controller = PlaybackController {
            bus,
            ctx,
            events_tx,
            next_source_id: 1,
            active: None,
            state: PlaybackState::Idle,
            position: 0.0,
        };

        (controller, events_rx)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn artifact(&self) -> Option<Arc<AudioArtifact>> {
        self.active.as_ref().map(|active| active.artifact.clone())
    }

    pub fn capabilities(&self) -> Option<Capabilities> {
        self.active.as_ref().map(|active| active.source.capabilities())
    }

    /// Id of the source currently bound, if any.
    pub fn active_source_id(&self) -> Option<SourceId> {
        self.active.as_ref().map(|active| active.source.id())
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.active
            .as_ref()
            .and_then(|active| active.source.duration().ok())
            .unwrap_or(0.0)
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.position, self.duration())
    }

    /// Tears down the current source and installs `artifact` in `Ready`.
    pub fn load_artifact(&mut self, artifact: Arc<AudioArtifact>) -> Result<()> {
        self.teardown();

        let source_id = self.next_source_id;
        self.next_source_id += 1;

        let events = SourceEventSender::new(source_id, self.events_tx.clone());
        let source = match AudioSourceAdapter::load(&artifact, &self.ctx, events) {
            Ok(source) => source,
            Err(e) => {
                self.set_state(PlaybackState::Idle);
                self.emit_progress();
                return Err(e);
            }
        };

        info!(
            "Loaded {:?} artifact as source {source_id} ({} chars of text)",
            artifact.mime_kind(),
            artifact.source_text().chars().count()
        );

        self.active = Some(ActiveItem { artifact, source });
        self.position = 0.0;
        self.set_state(PlaybackState::Ready);
        self.emit_progress();

        Ok(())
    }

    /// Plays from the beginning. Only meaningful from `Ready` or `Ended`.
    pub fn play(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            warn!("Nothing to play, generate some audio first");
            return Ok(());
        };

        match self.state {
            PlaybackState::Ready | PlaybackState::Ended => {
                active.source.play()?;
                self.position = 0.0;
                self.set_state(PlaybackState::Playing);
                self.emit_progress();
            }
            state => debug!("Ignoring play while {state}"),
        }

        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            debug!("Ignoring pause while {}", self.state);
            return Ok(());
        }

        if let Some(active) = self.active.as_mut() {
            active.source.pause()?;
            self.set_state(PlaybackState::Paused);
        }

        Ok(())
    }

    /// Continues from `Paused`. When the engine cannot resume, the error is
    /// returned and the controller stays paused.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            debug!("Ignoring resume while {}", self.state);
            return Ok(());
        }

        if let Some(active) = self.active.as_mut() {
            active.source.resume()?;
            self.set_state(PlaybackState::Playing);
        }

        Ok(())
    }

    /// Pauses while playing, otherwise gets audio going again: resumes when
    /// paused and plays from the top when ready or ended.
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Idle => {
                warn!("Nothing to play, generate some audio first");
                Ok(())
            }
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Ready | PlaybackState::Ended => self.play(),
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            debug!("Ignoring stop while {}", self.state);
            return Ok(());
        }

        if let Some(active) = self.active.as_mut() {
            active.source.stop()?;
            self.position = 0.0;
            self.set_state(PlaybackState::Ready);
            self.emit_progress();
        }

        Ok(())
    }

    /// Moves to `seconds`, clamped to the source's duration.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        let Some(active) = self.active.as_mut() else {
            warn!("Nothing to seek in, generate some audio first");
            return Ok(());
        };

        active.source.seek(seconds)?;
        self.position = active.source.current_time()?;
        trace!("Seeked to {:.2}s", self.position);
        self.emit_progress();

        Ok(())
    }

    pub fn seek_by(&mut self, delta: f64) -> Result<()> {
        self.seek(self.position + delta)
    }

    /// Applies a time update or end notification from the active source.
    /// Events from sources that were already replaced, or from an earlier
    /// pass of the active one, are dropped.
    pub fn handle_source_event(&mut self, event: SourceEvent) {
        let Some(active) = self.active.as_ref() else {
            trace!("Dropping event from stale source {}", event.source_id);
            return;
        };

        if active.source.id() != event.source_id {
            trace!("Dropping event from stale source {}", event.source_id);
            return;
        }

        if active.source.pass() != event.pass {
            trace!(
                "Dropping event from pass {} of source {}: {:?}",
                event.pass,
                event.source_id,
                event.kind
            );
            return;
        }

        match event.kind {
            SourceEventKind::TimeUpdate { position } if self.state == PlaybackState::Playing => {
                self.position = position;
                self.emit_progress();
            }
            // A pass can run out just before a pause lands
            SourceEventKind::Ended
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) =>
            {
                info!("Playback of source {} ended", event.source_id);
                self.position = 0.0;
                self.set_state(PlaybackState::Ended);
                self.emit_progress();
            }
            kind => trace!("Dropping source event while {}: {:?}", self.state, kind),
        }
    }

    /// File for the loaded artifact.
    pub fn download(&self, now: DateTime<Utc>) -> Result<DownloadFile> {
        let active = self.active.as_ref().ok_or(Error::NoArtifactLoaded)?;
        Ok(download::prepare(&active.artifact, now))
    }

    /// Releases the active source and returns to `Idle`.
    pub fn dispose(&mut self) {
        self.teardown();
        self.position = 0.0;
        self.set_state(PlaybackState::Idle);
        self.emit_progress();
    }

    pub fn handle_action(&mut self, action: PlaybackAction) -> Result<()> {
        match action {
            PlaybackAction::Play => self.play(),
            PlaybackAction::Pause => self.pause(),
            PlaybackAction::Resume => self.resume(),
            PlaybackAction::TogglePlayPause => self.toggle_play_pause(),
            PlaybackAction::Stop => self.stop(),
            PlaybackAction::Seek { position } => self.seek(position),
            PlaybackAction::SeekBy { delta } => self.seek_by(delta),
            PlaybackAction::Load(artifact) => self.load_artifact(artifact),
        }
    }

    fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            // Cleanup is best effort
            if let Err(e) = active.source.dispose() {
                error!("Failed to dispose source {}: {e}", active.source.id());
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!("Playback state {} -> {}", self.state, state);
            self.state = state;
            self.bus.send(Event::PlaybackState(state));
        }
    }

    fn emit_progress(&self) {
        self.bus.send(Event::Progress(self.progress()));
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Starts a controller driven by `Event::Playback` actions on the bus and by
/// its own sources' events.
pub fn init(bus: &EventBus, ctx: SourceContext) -> SharedPlayback {
    let (controller, source_rx) = PlaybackController::new(bus.clone(), ctx);
    let playback = Arc::new(RwLock::new(controller));

    handle_incoming_event_loop(bus, playback.clone(), source_rx);

    playback
}

fn handle_incoming_event_loop(
    bus: &EventBus,
    playback: SharedPlayback,
    mut source_rx: mpsc::UnboundedReceiver<SourceEvent>,
) {
    // Subscribe before returning so no action sent after init is missed
    let mut bus_rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = source_rx.recv() => {
                    playback.write().await.handle_source_event(event);
                }
                event = bus_rx.recv() => match event {
                    Some(Event::Playback(action)) => {
                        if let Err(e) = playback.write().await.handle_action(action) {
                            warn!("Playback command failed: {e}");
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    });
}
