//! Fakes for driving a session without a network or a real player.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::oneshot;

use crate::{
    error::LookupError,
    event::{StatusEvent, TrackMetadata},
    lyrics::{LyricsFetcher, LyricsPayload, LyricsQuery},
    player::PlaybackClock,
    tracker::{TrackChange, TrackSignature},
};

use super::handler::Session;

type Reply = Result<LyricsPayload, LookupError>;

pub fn session<F: LyricsFetcher + 'static>(fetcher: F) -> (Session, flume::Receiver<StatusEvent>) {
    let (tx, rx) = flume::unbounded();
    (Session::new(Arc::new(fetcher), tx, true), rx)
}

pub fn change(title: &str, artist: &str, duration_secs: f64) -> TrackChange {
    TrackChange {
        signature: TrackSignature {
            title: title.into(),
            artist: artist.into(),
        },
        metadata: TrackMetadata {
            title: title.into(),
            artist: artist.into(),
            duration_secs,
        },
    }
}

pub fn payload(synced: Option<&str>, plain: Option<&str>) -> LyricsPayload {
    LyricsPayload {
        synced_lyrics: synced.map(str::to_owned),
        plain_lyrics: plain.map(str::to_owned),
    }
}

/// Answers from a script: the first queued reply for the queried title, or
/// the default once those run out.
#[derive(Clone)]
pub struct Scripted {
    replies: Arc<Mutex<Vec<(String, Reply)>>>,
    default: Reply,
    queries: Arc<Mutex<Vec<LyricsQuery>>>,
}

impl Scripted {
    pub fn replies(replies: Vec<(&str, Reply)>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(|(t, r)| (t.to_owned(), r)).collect(),
            )),
            default: Err(LookupError::NotFound),
            queries: Arc::default(),
        }
    }

    pub fn synced(title: &str, lrc: &str) -> Self {
        Self {
            default: Ok(payload(Some(lrc), None)),
            ..Self::replies(vec![(title, Ok(payload(Some(lrc), None)))])
        }
    }

    pub fn queries(&self) -> Vec<LyricsQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LyricsFetcher for Scripted {
    async fn fetch(&self, query: &LyricsQuery) -> Reply {
        self.queries.lock().unwrap().push(query.clone());
        let mut replies = self.replies.lock().unwrap();
        match replies.iter().position(|(title, _)| *title == query.title) {
            Some(index) => replies.remove(index).1,
            None => self.default.clone(),
        }
    }
}

/// Holds every lookup until the test releases it through the title's sender.
pub struct Gated {
    gates: Mutex<HashMap<String, oneshot::Receiver<Reply>>>,
}

impl Gated {
    pub fn new(gates: Vec<(&str, oneshot::Receiver<Reply>)>) -> Self {
        Self {
            gates: Mutex::new(gates.into_iter().map(|(t, rx)| (t.to_owned(), rx)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl LyricsFetcher for Gated {
    async fn fetch(&self, query: &LyricsQuery) -> Reply {
        let gate = self.gates.lock().unwrap().remove(&query.title);
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(LookupError::Transport("gate dropped".into()))),
            None => Err(LookupError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct ManualClock(Mutex<f64>);

impl ManualClock {
    pub fn set(&self, secs: f64) {
        *self.0.lock().unwrap() = secs;
    }
}

impl PlaybackClock for ManualClock {
    fn position_secs(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}
