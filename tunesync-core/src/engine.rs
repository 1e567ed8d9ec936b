//! Playback synchronization engine.
//!
//! A single task owns every piece of mutable state (last snapshot, lyric
//! cache, last dispatched field values). Lyric lookups run on background
//! tasks and hand their documents back through a single-consumer queue;
//! presentation layers talk to the engine through an [`EngineHandle`].

use crate::change::{Change, ChangeDetector};
use crate::config::{SyncConfig, TunesyncConfig};
use crate::cursor::{LyricCursor, LyricView};
use crate::error::{CoreError, Result};
use crate::lyrics::{LyricDocument, LyricProvenance, TrackKey};
use crate::playback::PlaybackSnapshot;
use crate::provider::LyricsQuery;
use crate::scheduler::{Scheduler, Tick};
use crate::source::{PlaybackCommand, PlaybackSource};
use crate::store::LyricStore;
use crate::time::{millis_to_position, DurationExt};
use crate::view_model::{Field, ViewModel, ViewModelSink};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "tunesync::engine";

/// Capacity of the command channel
const COMMAND_CAPACITY: usize = 32;

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not running
    Idle,
    /// Ticking on the normal cadences
    Polling,
    /// An external interaction is in progress; nothing is fetched or dispatched
    Suspended,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Suspended => "suspended",
        })
    }
}

enum EngineCommand {
    InteractionStarted,
    InteractionEnded,
    Control {
        command: PlaybackCommand,
        reply: oneshot::Sender<Result<()>>,
    },
    ReloadLyrics,
    SaveLyrics {
        reply: oneshot::Sender<Result<PathBuf>>,
    },
}

/// Cloneable handle for signalling a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    state: watch::Receiver<EngineState>,
    cancel: CancellationToken,
}

impl EngineHandle {
    async fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::EngineStopped)
    }

    /// Current engine state
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Suspend polling, e.g. while the window is dragged or the user seeks.
    ///
    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine is gone.
    pub async fn interaction_started(&self) -> Result<()> {
        self.send(EngineCommand::InteractionStarted).await
    }

    /// Resume polling after the settle delay.
    ///
    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine is gone.
    pub async fn interaction_ended(&self) -> Result<()> {
        self.send(EngineCommand::InteractionEnded).await
    }

    /// Run a playback control command and wait for the source's answer.
    ///
    /// Out-of-range arguments are rejected here, before anything reaches the
    /// playback source.
    ///
    /// # Errors
    ///
    /// Returns the validation error, the source failure, or `EngineStopped`.
    pub async fn control(&self, command: PlaybackCommand) -> Result<()> {
        let command = command.validate()?;
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Control { command, reply }).await?;
        rx.await.map_err(|_| CoreError::EngineStopped)?
    }

    /// Drop the current track's cached lyrics and fetch them again.
    ///
    /// # Errors
    ///
    /// Returns `EngineStopped` if the engine is gone.
    pub async fn reload_lyrics(&self) -> Result<()> {
        self.send(EngineCommand::ReloadLyrics).await
    }

    /// Persist the current track's lyrics to local storage.
    ///
    /// # Errors
    ///
    /// Returns `LyricsNotFound` if there is nothing to save, an I/O error, or
    /// `EngineStopped`.
    pub async fn save_lyrics(&self) -> Result<PathBuf> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::SaveLyrics { reply }).await?;
        rx.await.map_err(|_| CoreError::EngineStopped)?
    }

    /// Stop the engine
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Lyrics state for the current track.
enum ActiveLyrics {
    NoTrack,
    Loading(TrackKey),
    Ready(Arc<LyricDocument>),
}

impl ActiveLyrics {
    fn key(&self) -> Option<&TrackKey> {
        match self {
            Self::NoTrack => None,
            Self::Loading(key) => Some(key),
            Self::Ready(document) => Some(&document.track_key),
        }
    }
}

/// Polls a [`PlaybackSource`], keeps lyrics in step with playback, and
/// pushes changed fields to a [`ViewModelSink`].
pub struct PlaybackSyncEngine {
    source: Arc<dyn PlaybackSource>,
    store: LyricStore,
    view: ViewModel,
    cursor: LyricCursor,
    scheduler: Box<dyn Scheduler>,
    sync: SyncConfig,
    persist_fetched: bool,

    state: EngineState,
    state_tx: watch::Sender<EngineState>,
    last: Option<PlaybackSnapshot>,
    active: ActiveLyrics,
    in_flight: HashSet<TrackKey>,
    last_request: Option<(TrackKey, Instant)>,
    settle_deadline: Option<Instant>,

    commands_tx: mpsc::Sender<EngineCommand>,
    commands_rx: mpsc::Receiver<EngineCommand>,
    lyrics_tx: mpsc::UnboundedSender<LyricDocument>,
    lyrics_rx: mpsc::UnboundedReceiver<LyricDocument>,
    cancel: CancellationToken,
}

impl PlaybackSyncEngine {
    /// Create an engine with its collaborators injected.
    pub fn new(
        source: Arc<dyn PlaybackSource>,
        store: LyricStore,
        sink: Arc<dyn ViewModelSink>,
        scheduler: Box<dyn Scheduler>,
        config: &TunesyncConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (lyrics_tx, lyrics_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(EngineState::Idle);

        Self {
            source,
            store,
            view: ViewModel::new(sink),
            cursor: LyricCursor::new(
                config.lyrics.loading_text.clone(),
                config.lyrics.no_lyrics_text.clone(),
            ),
            scheduler,
            sync: config.sync.clone(),
            persist_fetched: config.lyrics.persist_fetched,
            state: EngineState::Idle,
            state_tx,
            last: None,
            active: ActiveLyrics::NoTrack,
            in_flight: HashSet::new(),
            last_request: None,
            settle_deadline: None,
            commands_tx,
            commands_rx,
            lyrics_tx,
            lyrics_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token (e.g. one shared with a
    /// Ctrl+C handler)
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for signalling the engine once it runs
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            commands: self.commands_tx.clone(),
            state: self.state_tx.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        info!(target: LOG_TARGET, "Sync engine started with source {}", self.source.name());
        self.set_state(EngineState::Polling);

        loop {
            let settle = self.settle_deadline;
            let polling = self.state == EngineState::Polling;

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                Some(command) = self.commands_rx.recv() => self.handle_command(command).await,

                Some(document) = self.lyrics_rx.recv() => self.on_lyrics_fetched(document),

                () = tokio::time::sleep_until(settle.unwrap_or_else(Instant::now)), if settle.is_some() => {
                    self.finish_settle();
                }

                tick = self.scheduler.next(), if polling => self.tick(tick).await,
            }
        }

        self.set_state(EngineState::Idle);
        info!(target: LOG_TARGET, "Sync engine stopped");
    }

    /// Process one scheduler tick.
    pub async fn tick(&mut self, tick: Tick) {
        match tick {
            Tick::Info => self.refresh_info().await,
            Tick::Progress => self.refresh_progress(),
        }
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            debug!(target: LOG_TARGET, "Engine state {} -> {}", self.state, state);
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn dispatching(&self) -> bool {
        self.state == EngineState::Polling
    }

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::InteractionStarted => {
                if self.settle_deadline.take().is_some() {
                    debug!(target: LOG_TARGET, "Interaction restarted during settle delay");
                }
                self.set_state(EngineState::Suspended);
            }
            EngineCommand::InteractionEnded => {
                if self.state == EngineState::Suspended {
                    self.settle_deadline = Some(Instant::now() + self.sync.settle_delay());
                }
            }
            EngineCommand::Control { command, reply } => {
                let result = self.run_control(command).await;
                let _ = reply.send(result);
            }
            EngineCommand::ReloadLyrics => self.reload_lyrics(),
            EngineCommand::SaveLyrics { reply } => {
                let _ = reply.send(self.save_lyrics());
            }
        }
    }

    fn finish_settle(&mut self) {
        self.settle_deadline = None;
        self.set_state(EngineState::Polling);
        self.scheduler.reset();
    }

    async fn run_control(&mut self, command: PlaybackCommand) -> Result<()> {
        info!(target: LOG_TARGET, "Playback command: {}", command);
        if let Err(e) = self.source.execute(command).await {
            warn!(target: LOG_TARGET, "Playback command {} failed: {}", command, e);
            return Err(e);
        }

        if self.dispatching() {
            self.refresh_info().await;
        }
        Ok(())
    }

    /// Coarse cadence: fetch a snapshot and react to what changed.
    async fn refresh_info(&mut self) {
        let snapshot = match self.source.current_playback().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => PlaybackSnapshot::idle(),
            Err(e) => {
                warn!(target: LOG_TARGET, "Failed to fetch playback from {}: {}", self.source.name(), e);
                return;
            }
        };

        let changes = ChangeDetector::classify(self.last.as_ref(), &snapshot);
        if changes.is_empty() {
            self.last = Some(snapshot);
            return;
        }
        debug!(target: LOG_TARGET, "Playback changes: {:?}", changes.iter().collect::<Vec<_>>());

        let track_changed = changes.contains(Change::TrackChanged);
        if track_changed {
            self.on_track_changed(&snapshot);
        }
        if track_changed || changes.contains(Change::PlayStateChanged) {
            self.view.set(Field::IsPlaying, snapshot.is_playing);
        }

        self.last = Some(snapshot);

        if track_changed || changes.contains(Change::ProgressChanged) {
            self.refresh_progress();
        }
    }

    fn on_track_changed(&mut self, snapshot: &PlaybackSnapshot) {
        if snapshot.has_track() {
            info!(target: LOG_TARGET, "Now playing: {} - {}", snapshot.artist, snapshot.title);
        } else {
            info!(target: LOG_TARGET, "Playback stopped");
        }

        self.view.set(Field::SongTitle, snapshot.title.as_str());
        self.view.set(Field::SongArtist, snapshot.artist.as_str());
        self.view.set(Field::ReleaseYear, snapshot.release_year.as_str());
        self.view.set(Field::CoverUrl, snapshot.cover_url.as_str());

        match lyric_request(snapshot) {
            Some((key, query)) => self.request_lyrics(key, query),
            None => self.active = ActiveLyrics::NoTrack,
        }
    }

    /// Fine cadence: extrapolate position and re-resolve the lyric cursor.
    fn refresh_progress(&mut self) {
        let Some(snapshot) = &self.last else {
            return;
        };

        let position = snapshot.position_at(Instant::now());
        let fraction = snapshot.progress_fraction(position);
        let lyrics = match &self.active {
            ActiveLyrics::NoTrack => LyricCursor::empty(),
            ActiveLyrics::Loading(_) => self.cursor.loading(),
            ActiveLyrics::Ready(document) => self
                .cursor
                .resolve(&document.lines, millis_to_position(position)),
        };

        self.dispatch_progress(fraction, lyrics);
    }

    fn dispatch_progress(&mut self, fraction: f64, lyrics: LyricView) {
        self.view.set(Field::ProgressFraction, fraction);
        self.view.set_lyrics(lyrics);
    }

    fn request_lyrics(&mut self, key: TrackKey, query: LyricsQuery) {
        if let Some(document) = self.store.cached(&key) {
            debug!(target: LOG_TARGET, "Lyrics for {} already cached", key);
            self.active = ActiveLyrics::Ready(document);
            return;
        }

        self.active = ActiveLyrics::Loading(key.clone());
        self.spawn_fetch(key, query);
    }

    fn spawn_fetch(&mut self, key: TrackKey, query: LyricsQuery) {
        if self.coalesced(&key) {
            return;
        }

        self.in_flight.insert(key.clone());
        self.last_request = Some((key.clone(), Instant::now()));

        let fetcher = self.store.fetcher();
        let tx = self.lyrics_tx.clone();
        let timeout = self.sync.lyrics_timeout();
        tokio::spawn(async move {
            let fetched = tokio::time::timeout(timeout, fetcher.fetch(&key, &query)).await;
            let document = match fetched {
                Ok(document) => document,
                Err(_) => {
                    warn!(target: LOG_TARGET, "Lyrics lookup for {} timed out after {:?}", key, timeout);
                    LyricDocument::empty(key)
                }
            };
            // Engine gone: result is simply dropped
            let _ = tx.send(document);
        });
    }

    /// Whether a request for `key` is in flight or was issued within the
    /// coalescing window.
    fn coalesced(&self, key: &TrackKey) -> bool {
        if self.in_flight.contains(key) {
            debug!(target: LOG_TARGET, "Lyrics for {} already in flight", key);
            return true;
        }
        match &self.last_request {
            Some((last_key, at))
                if last_key == key && at.elapsed() < self.sync.reload_coalesce() =>
            {
                debug!(target: LOG_TARGET, "Coalesced lyrics request for {}", key);
                true
            }
            _ => false,
        }
    }

    fn on_lyrics_fetched(&mut self, document: LyricDocument) {
        let key = document.track_key.clone();
        self.in_flight.remove(&key);

        let provenance = document.provider;
        let document = self.store.insert(document);

        if self.persist_fetched && provenance == LyricProvenance::Remote {
            if let Err(e) = self.store.persist(&key) {
                warn!(target: LOG_TARGET, "Failed to save fetched lyrics for {}: {}", key, e);
            }
        }

        if !matches!(&self.active, ActiveLyrics::Loading(active) if *active == key) {
            debug!(target: LOG_TARGET, "Cached lyrics for {} which is no longer active", key);
            return;
        }

        info!(
            target: LOG_TARGET,
            "Lyrics ready for {} ({} lines, {})",
            key,
            document.lines.len(),
            provenance
        );
        self.active = ActiveLyrics::Ready(document);

        if self.dispatching() {
            self.refresh_progress();
        }
    }

    fn reload_lyrics(&mut self) {
        let Some((key, query)) = self.last.as_ref().and_then(lyric_request) else {
            debug!(target: LOG_TARGET, "Nothing playing, no lyrics to reload");
            return;
        };

        if self.coalesced(&key) {
            return;
        }

        info!(target: LOG_TARGET, "Reloading lyrics for {}", key);
        self.store.evict(&key);
        self.request_lyrics(key, query);
        if self.dispatching() {
            self.refresh_progress();
        }
    }

    fn save_lyrics(&self) -> Result<PathBuf> {
        let key = self.active.key().ok_or_else(|| CoreError::LyricsNotFound {
            track: String::new(),
            artist: String::new(),
        })?;
        self.store.persist(key)
    }
}

/// Track key and provider query for a snapshot, `None` when nothing usable
/// is playing.
fn lyric_request(snapshot: &PlaybackSnapshot) -> Option<(TrackKey, LyricsQuery)> {
    if !snapshot.has_track() || snapshot.title.is_empty() {
        return None;
    }

    let artist = snapshot.primary_artist();
    let key = TrackKey::new(artist, &snapshot.title);
    let mut query = LyricsQuery::new(snapshot.title.clone(), artist);
    if snapshot.duration_ms > 0 {
        query = query.with_duration(Duration::from_millis(snapshot.duration_ms).as_secs_u32());
    }
    Some((key, query))
}
