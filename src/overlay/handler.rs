use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    config::LyricFixConfig,
    error::LookupError,
    event::{FetchStatus, LineTransition, StatusEvent, TrackMetadata},
    lyrics::{fetch_with_fallback, LyricLine, LyricsContent, LyricsFetcher, LyricsPayload, LyricsQuery},
    player::SimulatedPlayer,
    ticker::IntervalTicker,
    tracker::{MetadataSource, TrackChange, TrackSignature, TrackTracker},
};

use super::{
    synchronizer::Synchronizer,
    watch::{SyncWatch, TrackWatch},
};

pub type SharedState = Arc<Mutex<LyricsState>>;

/// Everything the overlay knows about the current track. One per session.
#[derive(Debug, Default)]
pub struct LyricsState {
    track: Option<TrackMetadata>,
    signature: Option<TrackSignature>,
    status: FetchStatus,
    sync: Synchronizer,
    plain: Option<String>,
    progress_secs: f64,
    generation: u64,
}

/// Identifies one lookup. Only the ticket of the latest `begin_load` may
/// install its result.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTicket {
    generation: u64,
    pub signature: TrackSignature,
}

impl LyricsState {
    pub fn track(&self) -> Option<&TrackMetadata> {
        self.track.as_ref()
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn lines(&self) -> &[LyricLine] {
        self.sync.lines()
    }

    pub fn plain_lyrics(&self) -> Option<&str> {
        self.plain.as_deref()
    }

    pub fn active_line(&self) -> isize {
        self.sync.active_line()
    }

    pub fn progress_secs(&self) -> f64 {
        self.progress_secs
    }

    /// Drops whatever the previous track left behind and hands out the
    /// ticket for the new lookup.
    pub fn begin_load(&mut self, change: &TrackChange) -> LoadTicket {
        self.generation += 1;
        self.track = Some(change.metadata.clone());
        self.signature = Some(change.signature.clone());
        self.sync.clear();
        self.plain = None;
        self.status = FetchStatus::Searching;
        LoadTicket {
            generation: self.generation,
            signature: change.signature.clone(),
        }
    }

    /// Installs a lookup result. Returns `None` when the ticket has been
    /// superseded and the result was dropped.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        outcome: Result<LyricsPayload, LookupError>,
    ) -> Option<FetchStatus> {
        if ticket.generation != self.generation {
            tracing::debug!(
                track = %ticket.signature,
                stale = ticket.generation,
                current = self.generation,
                "lyrics.stale_response"
            );
            return None;
        }
        if let Err(e) = &outcome {
            tracing::warn!(track = %ticket.signature, error = %e, "lyrics.lookup_failed");
        }

        let (content, status) = LyricsContent::resolve(outcome);
        match content {
            LyricsContent::Synced(lines) => self.sync.replace(lines),
            LyricsContent::Unsynced(text) => {
                self.sync.clear();
                self.plain = Some(text);
            }
            LyricsContent::Empty => self.sync.clear(),
        }
        self.status = status;
        tracing::info!(track = %ticket.signature, %status, lines = self.sync.lines().len(), "lyrics.status");
        Some(status)
    }

    pub fn advance(&mut self, time: f64) -> Option<LineTransition> {
        self.progress_secs = time;
        self.sync.advance(time)
    }

    pub fn seek_to(&self, index: usize) -> Option<f64> {
        self.sync.line_time(index)
    }
}

/// The per-session context shared by the polling loops and the display.
#[derive(Clone)]
pub struct Session {
    state: SharedState,
    fetcher: Arc<dyn LyricsFetcher>,
    events: flume::Sender<StatusEvent>,
    duration_fallback: bool,
}

impl Session {
    pub fn new(
        fetcher: Arc<dyn LyricsFetcher>,
        events: flume::Sender<StatusEvent>,
        duration_fallback: bool,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(LyricsState::default())),
            fetcher,
            events,
            duration_fallback,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, LyricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StatusEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn emit_status(&self, status: FetchStatus) {
        self.emit(StatusEvent::Status {
            status,
            message: status.message().to_owned(),
        });
    }

    /// Clears the display and announces the new track. Call on the change
    /// edge; later calls supersede earlier tickets.
    pub fn start_load(&self, change: &TrackChange) -> LoadTicket {
        let ticket = self.state().begin_load(change);
        self.announce(&change.metadata);
        ticket
    }

    fn announce(&self, metadata: &TrackMetadata) {
        self.emit(StatusEvent::TrackChanged {
            metadata: metadata.clone(),
        });
        self.emit_status(FetchStatus::Searching);
    }

    /// Looks the lyrics up for a ticket from `start_load`. Returns the
    /// installed status, or `None` if a newer track took over meanwhile.
    pub async fn complete_load(
        &self,
        ticket: LoadTicket,
        metadata: TrackMetadata,
    ) -> Option<FetchStatus> {
        let query = LyricsQuery {
            title: metadata.title,
            artist: metadata.artist,
            duration_secs: Some(metadata.duration_secs),
        };
        let outcome =
            fetch_with_fallback(self.fetcher.as_ref(), &query, self.duration_fallback).await;

        let status = self.state().finish_load(&ticket, outcome)?;
        self.emit_status(status);
        Some(status)
    }

    #[cfg(test)]
    pub async fn load_track(&self, change: TrackChange) -> Option<FetchStatus> {
        let ticket = self.start_load(&change);
        self.complete_load(ticket, change.metadata).await
    }

    /// Looks the current track up again.
    pub async fn reload(&self) -> Option<FetchStatus> {
        let (ticket, metadata) = {
            let mut state = self.state();
            let change = TrackChange {
                signature: state.signature.clone()?,
                metadata: state.track.clone()?,
            };
            (state.begin_load(&change), change.metadata)
        };
        tracing::info!(track = %ticket.signature, "lyrics.reload");
        self.announce(&metadata);
        self.complete_load(ticket, metadata).await
    }

    pub fn advance(&self, time: f64) -> Option<LineTransition> {
        let transition = self.state().advance(time);
        if let Some(transition) = transition {
            self.emit(StatusEvent::SwitchLyricLine { transition });
        }
        transition
    }

    /// Time of the given line, for the caller to apply to the player.
    pub fn seek_to(&self, index: usize) -> Option<f64> {
        self.state().seek_to(index)
    }
}

pub struct BackendContext {
    pub session: Session,
    pub player: SimulatedPlayer,
    pub events: flume::Receiver<StatusEvent>,
    pub config: Arc<LyricFixConfig>,
}

#[async_trait::async_trait]
pub trait LyricsBackend {
    async fn run_backend(&mut self, ctx: BackendContext) -> anyhow::Result<()>;
}

pub struct OverlayHandler<T: LyricsBackend> {
    session: Session,
    backend: T,
}

impl<T: LyricsBackend + Send + Sync + 'static> OverlayHandler<T> {
    pub fn new(session: Session, backend: T) -> Self {
        Self { session, backend }
    }

    /// Runs both polling loops until the backend returns.
    pub async fn run(
        mut self,
        source: Arc<dyn MetadataSource>,
        player: SimulatedPlayer,
        events: flume::Receiver<StatusEvent>,
        config: Arc<LyricFixConfig>,
    ) -> anyhow::Result<()> {
        let general = &config.general;
        let track_watch = TrackWatch::new(
            self.session.clone(),
            TrackTracker::new(general.min_duration_secs),
            source,
        );
        let sync_watch = SyncWatch::new(self.session.clone(), Arc::new(player.clone()));
        let track_handler =
            tokio::task::spawn(track_watch.run(IntervalTicker::from_millis(general.track_poll_ms)));
        let sync_handler =
            tokio::task::spawn(sync_watch.run(IntervalTicker::from_millis(general.sync_poll_ms)));

        let ctx = BackendContext {
            session: self.session.clone(),
            player,
            events,
            config: config.clone(),
        };
        let backend_handler =
            tokio::task::spawn(async move { self.backend.run_backend(ctx).await });

        let backend = backend_handler.await;
        track_handler.abort();
        sync_handler.abort();
        backend??;
        Ok(())
    }
}
