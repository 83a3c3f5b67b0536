use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    event::{FetchStatus, LineTransition},
    player::PlaybackClock,
    ticker::Ticker,
    tracker::{MetadataSource, TrackTracker},
};

use super::handler::Session;

/// Samples now-playing metadata and starts a lookup on every track change.
pub struct TrackWatch {
    session: Session,
    tracker: TrackTracker,
    source: Arc<dyn MetadataSource>,
}

impl TrackWatch {
    pub fn new(session: Session, tracker: TrackTracker, source: Arc<dyn MetadataSource>) -> Self {
        Self {
            session,
            tracker,
            source,
        }
    }

    /// The old lyrics are gone by the time this returns. The lookup itself
    /// runs on its own task so a slow service never holds up the next sample.
    pub fn poll(&mut self) -> Option<JoinHandle<Option<FetchStatus>>> {
        let change = self.tracker.sample(&self.source.snapshot())?;
        let ticket = self.session.start_load(&change);
        let session = self.session.clone();
        Some(tokio::task::spawn(async move {
            session.complete_load(ticket, change.metadata).await
        }))
    }

    pub async fn run<T: Ticker>(mut self, mut ticker: T) {
        while ticker.tick().await {
            self.poll();
        }
    }
}

/// Feeds the playback position to the synchronizer.
pub struct SyncWatch {
    session: Session,
    clock: Arc<dyn PlaybackClock>,
}

impl SyncWatch {
    pub fn new(session: Session, clock: Arc<dyn PlaybackClock>) -> Self {
        Self { session, clock }
    }

    pub fn poll(&self) -> Option<LineTransition> {
        self.session.advance(self.clock.position_secs())
    }

    pub async fn run<T: Ticker>(self, mut ticker: T) {
        while ticker.tick().await {
            self.poll();
        }
    }
}
