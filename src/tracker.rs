use std::{fmt, sync::Arc};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::event::TrackMetadata;

lazy_static! {
    static ref FEATURING: Regex =
        Regex::new(r"(?i)(?:\s+|\s*[(\[])(?:feat\.?|ft\.|featuring)\s.*$").unwrap();
}

const ARTIST_SEPARATOR: char = '•';

/// One reading of a now-playing surface. Any field may be missing while the
/// host player is still loading or navigating.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetadataSnapshot {
    pub title: Option<String>,
    pub artist: Option<String>,
    #[serde(alias = "duration")]
    pub duration_secs: Option<f64>,
}

impl MetadataSnapshot {
    pub fn new(title: &str, artist: &str, duration_secs: f64) -> Self {
        Self {
            title: Some(title.to_owned()),
            artist: Some(artist.to_owned()),
            duration_secs: Some(duration_secs),
        }
    }

    fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

pub trait MetadataSource: Send + Sync {
    fn snapshot(&self) -> MetadataSnapshot;
}

/// Picks the rich snapshot unless it has no title, in which case the scraped
/// one is used. A missing duration is borrowed from the other snapshot since
/// the duration usually comes from the media element rather than the tags.
pub fn preferred_snapshot(rich: MetadataSnapshot, scraped: MetadataSnapshot) -> MetadataSnapshot {
    let (mut chosen, other) = if rich.has_title() {
        (rich, scraped)
    } else {
        (scraped, rich)
    };
    if chosen.duration_secs.is_none() {
        chosen.duration_secs = other.duration_secs;
    }
    chosen
}

/// The rich source backed by an optional scraped one, re-decided on every
/// snapshot.
pub struct PreferredSource {
    rich: Arc<dyn MetadataSource>,
    scraped: Option<Arc<dyn MetadataSource>>,
}

impl PreferredSource {
    pub fn new(rich: Arc<dyn MetadataSource>, scraped: Option<Arc<dyn MetadataSource>>) -> Self {
        Self { rich, scraped }
    }
}

impl MetadataSource for PreferredSource {
    fn snapshot(&self) -> MetadataSnapshot {
        let rich = self.rich.snapshot();
        match &self.scraped {
            Some(scraped) if !rich.has_title() || rich.duration_secs.is_none() => {
                preferred_snapshot(rich, scraped.snapshot())
            }
            _ => rich,
        }
    }
}

/// Keeps only the leading artist of strings like `Artist • Album • 2019` or
/// `Artist feat. Someone`. Best effort; falls back to the trimmed input if
/// nothing would be left.
pub fn normalize_artist(raw: &str) -> String {
    let leading = raw.split(ARTIST_SEPARATOR).next().unwrap_or_default();
    let stripped = FEATURING.replace(leading, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        raw.trim().to_owned()
    } else {
        stripped.to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackSignature {
    pub title: String,
    pub artist: String,
}

impl fmt::Display for TrackSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackChange {
    pub signature: TrackSignature,
    pub metadata: TrackMetadata,
}

/// Raises a change edge once per distinct track.
#[derive(Debug, Clone)]
pub struct TrackTracker {
    last: Option<TrackSignature>,
    min_duration_secs: f64,
}

impl TrackTracker {
    pub fn new(min_duration_secs: f64) -> Self {
        Self {
            last: None,
            min_duration_secs,
        }
    }

    pub fn sample(&mut self, snapshot: &MetadataSnapshot) -> Option<TrackChange> {
        let title = snapshot.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return None;
        }
        let duration = snapshot.duration_secs?;
        if !duration.is_finite() || duration <= self.min_duration_secs {
            return None;
        }

        let signature = TrackSignature {
            title: title.to_owned(),
            artist: normalize_artist(snapshot.artist.as_deref().unwrap_or_default()),
        };
        if self.last.as_ref() == Some(&signature) {
            return None;
        }

        tracing::info!(track = %signature, duration, "track.changed");
        self.last = Some(signature.clone());
        Some(TrackChange {
            metadata: TrackMetadata {
                title: signature.title.clone(),
                artist: signature.artist.clone(),
                duration_secs: duration,
            },
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_snapshot_changes_once() {
        let mut tracker = TrackTracker::new(1.0);
        let snapshot = MetadataSnapshot::new("Song", "Artist", 200.0);

        assert!(tracker.sample(&snapshot).is_some());
        for _ in 0..5 {
            assert_eq!(tracker.sample(&snapshot), None);
        }
    }

    #[test]
    fn provider_flap_is_not_a_change() {
        let mut tracker = TrackTracker::new(1.0);
        let rich = MetadataSnapshot::new("Song", "Artist", 200.0);
        let scraped = MetadataSnapshot::new("  Song ", "Artist • Album • 2021", 200.4);

        assert!(tracker.sample(&rich).is_some());
        for _ in 0..3 {
            assert_eq!(tracker.sample(&scraped), None);
            assert_eq!(tracker.sample(&rich), None);
        }
    }

    #[test]
    fn metadata_gap_keeps_previous_track() {
        let mut tracker = TrackTracker::new(1.0);
        let song = MetadataSnapshot::new("Song", "Artist", 200.0);
        tracker.sample(&song);

        let gap = MetadataSnapshot {
            title: None,
            ..song.clone()
        };
        assert_eq!(tracker.sample(&gap), None);
        assert_eq!(tracker.sample(&song), None);
    }

    #[test]
    fn unloaded_duration_is_ignored() {
        let mut tracker = TrackTracker::new(1.0);
        for duration in [None, Some(0.0), Some(1.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let snapshot = MetadataSnapshot {
                duration_secs: duration,
                ..MetadataSnapshot::new("Song", "Artist", 0.0)
            };
            assert_eq!(tracker.sample(&snapshot), None);
        }
        assert!(tracker
            .sample(&MetadataSnapshot::new("Song", "Artist", 200.0))
            .is_some());
    }

    #[test]
    fn new_title_is_a_change() {
        let mut tracker = TrackTracker::new(1.0);
        tracker.sample(&MetadataSnapshot::new("One", "Artist", 200.0));
        let change = tracker
            .sample(&MetadataSnapshot::new("Two", "Artist", 180.0))
            .unwrap();
        assert_eq!(change.metadata.title, "Two");
        assert_eq!(change.metadata.duration_secs, 180.0);
    }

    #[test]
    fn album_suffix_is_stripped_from_change() {
        let mut tracker = TrackTracker::new(1.0);
        let change = tracker
            .sample(&MetadataSnapshot::new("Song", "Artist • Album", 200.0))
            .unwrap();
        assert_eq!(change.metadata.artist, "Artist");
        assert_eq!(change.signature.to_string(), "Song - Artist");
    }

    #[test]
    fn artist_normalization() {
        assert_eq!(normalize_artist("Artist • Album • 2019"), "Artist");
        assert_eq!(normalize_artist("Artist feat. Someone"), "Artist");
        assert_eq!(normalize_artist("Artist (feat. Someone)"), "Artist");
        assert_eq!(normalize_artist("Artist ft. Someone • Album"), "Artist");
        assert_eq!(normalize_artist("Artist Featuring Someone"), "Artist");
        assert_eq!(normalize_artist("Daft Punk"), "Daft Punk");
        assert_eq!(normalize_artist("  Featurette  "), "Featurette");
        assert_eq!(normalize_artist(""), "");
    }

    #[test]
    fn rich_source_preferred_when_titled() {
        let rich = MetadataSnapshot {
            duration_secs: None,
            ..MetadataSnapshot::new("Rich", "A", 0.0)
        };
        let scraped = MetadataSnapshot::new("Scraped", "B", 123.0);

        let chosen = preferred_snapshot(rich, scraped.clone());
        assert_eq!(chosen.title.as_deref(), Some("Rich"));
        assert_eq!(chosen.duration_secs, Some(123.0));

        let untitled = MetadataSnapshot {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(preferred_snapshot(untitled, scraped.clone()), scraped);
    }

    struct Fixed(MetadataSnapshot);

    impl MetadataSource for Fixed {
        fn snapshot(&self) -> MetadataSnapshot {
            self.0.clone()
        }
    }

    #[test]
    fn preferred_source_falls_back_per_sample() {
        let scraped = MetadataSnapshot::new("Song", "Artist • Album", 200.0);
        let gap = PreferredSource::new(
            Arc::new(Fixed(MetadataSnapshot::default())),
            Some(Arc::new(Fixed(scraped.clone()))),
        );
        assert_eq!(gap.snapshot(), scraped);

        let rich = MetadataSnapshot::new("Song", "Artist", 200.0);
        let full = PreferredSource::new(
            Arc::new(Fixed(rich.clone())),
            Some(Arc::new(Fixed(scraped))),
        );
        assert_eq!(full.snapshot(), rich);

        let alone = PreferredSource::new(Arc::new(Fixed(MetadataSnapshot::default())), None);
        assert_eq!(alone.snapshot(), MetadataSnapshot::default());
    }
}
