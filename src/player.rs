use std::{
    path::PathBuf,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Context};
use tokio::time::Instant;

use crate::tracker::{MetadataSnapshot, MetadataSource};

pub trait PlaybackClock: Send + Sync {
    fn position_secs(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub title: String,
    pub artist: String,
    pub duration_secs: f64,
}

impl FromStr for PlaylistEntry {
    type Err = anyhow::Error;

    /// `Title|Artist|Seconds`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('|').map(str::trim);
        let (Some(title), Some(artist), Some(duration), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow!("expected Title|Artist|Seconds, got {s:?}"));
        };
        let duration_secs = duration
            .parse::<f64>()
            .with_context(|| format!("bad duration {duration:?}"))?;
        if title.is_empty() || !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(anyhow!("track needs a title and a positive duration: {s:?}"));
        }
        Ok(Self {
            title: title.to_owned(),
            artist: artist.to_owned(),
            duration_secs,
        })
    }
}

#[derive(Debug)]
struct PlayerInner {
    playlist: Vec<PlaylistEntry>,
    current: usize,
    started: Instant,
    offset: f64,
}

impl PlayerInner {
    fn raw_position(&self) -> f64 {
        self.offset + self.started.elapsed().as_secs_f64()
    }

    /// Moves on to the next entry when the current one has run out. The last
    /// entry stays parked at its end.
    fn roll(&mut self) {
        while let Some(entry) = self.playlist.get(self.current) {
            let overflow = self.raw_position() - entry.duration_secs;
            if overflow < 0.0 {
                return;
            }
            if self.current + 1 >= self.playlist.len() {
                self.offset = entry.duration_secs;
                self.started = Instant::now();
                return;
            }
            self.current += 1;
            self.offset = overflow;
            self.started = Instant::now();
        }
    }

    fn position(&mut self) -> f64 {
        self.roll();
        match self.playlist.get(self.current) {
            Some(entry) => self.raw_position().min(entry.duration_secs),
            None => 0.0,
        }
    }
}

/// A playlist that plays itself against the (tokio) clock. Stands in for the
/// host player: it is the rich metadata source and the playback position.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    inner: Arc<Mutex<PlayerInner>>,
}

impl SimulatedPlayer {
    pub fn new(playlist: Vec<PlaylistEntry>, start_secs: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlayerInner {
                playlist,
                current: 0,
                started: Instant::now(),
                offset: start_secs.max(0.0),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<PlaylistEntry> {
        let mut inner = self.lock();
        inner.roll();
        inner.playlist.get(inner.current).cloned()
    }

    pub fn seek(&self, secs: f64) {
        let mut inner = self.lock();
        inner.roll();
        let limit = inner
            .playlist
            .get(inner.current)
            .map_or(0.0, |entry| entry.duration_secs);
        inner.offset = secs.clamp(0.0, limit);
        inner.started = Instant::now();
        tracing::debug!(secs = inner.offset, "player.seek");
    }

    pub fn skip(&self) {
        let mut inner = self.lock();
        inner.roll();
        if inner.current + 1 < inner.playlist.len() {
            inner.current += 1;
            inner.offset = 0.0;
            inner.started = Instant::now();
        }
    }

    /// True once the last entry has played to its end.
    pub fn finished(&self) -> bool {
        let mut inner = self.lock();
        let position = inner.position();
        match inner.playlist.last() {
            Some(last) => inner.current + 1 == inner.playlist.len() && position >= last.duration_secs,
            None => true,
        }
    }
}

impl PlaybackClock for SimulatedPlayer {
    fn position_secs(&self) -> f64 {
        self.lock().position()
    }
}

impl MetadataSource for SimulatedPlayer {
    fn snapshot(&self) -> MetadataSnapshot {
        match self.current() {
            Some(entry) => MetadataSnapshot::new(&entry.title, &entry.artist, entry.duration_secs),
            None => MetadataSnapshot::default(),
        }
    }
}

/// Now-playing JSON written by some other program, e.g.
/// `{"title": "Song", "artist": "Artist • Album", "duration": 200}`.
/// Unreadable or half-written files read as an empty snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MetadataSource for JsonFileSource {
    fn snapshot(&self) -> MetadataSnapshot {
        let read = std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from));
        match read {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::trace!(path = %self.path.display(), error = %e, "now_playing.unreadable");
                MetadataSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(title: &str, duration_secs: f64) -> PlaylistEntry {
        PlaylistEntry {
            title: title.into(),
            artist: "Artist".into(),
            duration_secs,
        }
    }

    #[test]
    fn playlist_entry_from_str() {
        let parsed: PlaylistEntry = "Song | Artist • Album | 200.5".parse().unwrap();
        assert_eq!(parsed.title, "Song");
        assert_eq!(parsed.artist, "Artist • Album");
        assert_eq!(parsed.duration_secs, 200.5);

        assert!("Song|Artist".parse::<PlaylistEntry>().is_err());
        assert!("Song|Artist|abc".parse::<PlaylistEntry>().is_err());
        assert!("|Artist|20".parse::<PlaylistEntry>().is_err());
        assert!("Song|Artist|20|extra".parse::<PlaylistEntry>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn plays_through_playlist() {
        let player = SimulatedPlayer::new(vec![entry("One", 10.0), entry("Two", 5.0)], 0.0);
        assert_eq!(player.snapshot().title.as_deref(), Some("One"));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!((player.position_secs() - 4.0).abs() < 1e-6);

        tokio::time::advance(Duration::from_secs(7)).await;
        assert_eq!(player.snapshot().title.as_deref(), Some("Two"));
        assert!((player.position_secs() - 1.0).abs() < 1e-6);
        assert!(!player.finished());

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(player.finished());
        assert_eq!(player.position_secs(), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_and_skip() {
        let player = SimulatedPlayer::new(vec![entry("One", 10.0), entry("Two", 5.0)], 2.0);
        player.seek(8.5);
        assert!((player.position_secs() - 8.5).abs() < 1e-6);
        player.seek(-3.0);
        assert_eq!(player.position_secs(), 0.0);

        player.skip();
        assert_eq!(player.current().map(|e| e.title), Some("Two".to_owned()));
        player.skip();
        assert_eq!(player.current().map(|e| e.title), Some("Two".to_owned()));
    }

    #[tokio::test]
    async fn empty_playlist_has_no_metadata() {
        let player = SimulatedPlayer::new(Vec::new(), 0.0);
        assert_eq!(player.snapshot(), MetadataSnapshot::default());
        assert!(player.finished());
    }

    #[test]
    fn json_file_source() {
        let path = std::env::temp_dir().join(format!("lyricfix-np-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"title":"Song","artist":"Artist • Album","duration":200}"#)
            .unwrap();
        let source = JsonFileSource::new(path.clone());
        assert_eq!(
            source.snapshot(),
            MetadataSnapshot::new("Song", "Artist • Album", 200.0)
        );

        std::fs::write(&path, "{\"title\":").unwrap();
        assert_eq!(source.snapshot(), MetadataSnapshot::default());

        std::fs::remove_file(&path).ok();
        assert_eq!(source.snapshot(), MetadataSnapshot::default());
    }
}
