use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    TrackChanged {
        metadata: TrackMetadata,
    },
    Status {
        status: FetchStatus,
        message: String,
    },
    SwitchLyricLine {
        transition: LineTransition,
    },
}

/// What the tracker reports when a new track starts playing.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTransition {
    pub from: isize,
    pub to: isize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Searching,
    Synced,
    Unsynced,
    NotFound,
    Error,
}

impl FetchStatus {
    pub fn message(self) -> &'static str {
        match self {
            FetchStatus::Idle => "Ready",
            FetchStatus::Searching => "Searching...",
            FetchStatus::Synced => "Synced",
            FetchStatus::Unsynced => "Unsynced",
            FetchStatus::NotFound => "No lyrics found",
            FetchStatus::Error => "Error",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
