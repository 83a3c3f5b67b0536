use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::{config::ApiConfiguration, error::LookupError, event::FetchStatus};

pub mod lrc;

#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub time: f64,
    pub text: String,
}

/// The part of an LRCLIB record we care about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayload {
    pub synced_lyrics: Option<String>,
    pub plain_lyrics: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LyricsQuery {
    pub title: String,
    pub artist: String,
    pub duration_secs: Option<f64>,
}

impl LyricsQuery {
    fn without_duration(&self) -> Self {
        Self {
            duration_secs: None,
            ..self.clone()
        }
    }
}

/// What a finished lookup leaves behind for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LyricsContent {
    #[default]
    Empty,
    Synced(Vec<LyricLine>),
    Unsynced(String),
}

impl LyricsContent {
    /// Folds a lookup result into displayable content and a status. A synced
    /// payload that yields no lines falls through to the plain text, and to
    /// "not found" when there is none.
    pub fn resolve(outcome: Result<LyricsPayload, LookupError>) -> (Self, FetchStatus) {
        let payload = match outcome {
            Ok(payload) => payload,
            Err(LookupError::NotFound) => return (LyricsContent::Empty, FetchStatus::NotFound),
            Err(_) => return (LyricsContent::Empty, FetchStatus::Error),
        };

        let synced = payload
            .synced_lyrics
            .as_deref()
            .map(lrc::parse)
            .unwrap_or_default();
        if !synced.is_empty() {
            return (LyricsContent::Synced(synced), FetchStatus::Synced);
        }
        match payload.plain_lyrics {
            Some(plain) if !plain.trim().is_empty() => {
                (LyricsContent::Unsynced(plain), FetchStatus::Unsynced)
            }
            _ => (LyricsContent::Empty, FetchStatus::NotFound),
        }
    }
}

#[async_trait::async_trait]
pub trait LyricsFetcher: Send + Sync {
    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsPayload, LookupError>;
}

/// Primary lookup with the duration, then at most one retry without it.
pub async fn fetch_with_fallback<F: LyricsFetcher + ?Sized>(
    fetcher: &F,
    query: &LyricsQuery,
    allow_fallback: bool,
) -> Result<LyricsPayload, LookupError> {
    match fetcher.fetch(query).await {
        Ok(payload) => Ok(payload),
        Err(e) if allow_fallback && query.duration_secs.is_some() => {
            tracing::warn!(error = %e, title = %query.title, "lyrics.fallback");
            fetcher.fetch(&query.without_duration()).await
        }
        Err(e) => Err(e),
    }
}

/// Client for the LRCLIB `get` endpoint.
#[derive(Debug, Clone)]
pub struct LrcLibClient {
    client: Client,
    base: Url,
}

impl LrcLibClient {
    pub fn new(api: &ApiConfiguration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(api.user_agent.clone())
            .timeout(Duration::from_millis(api.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base: api.lyrics_api_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl LyricsFetcher for LrcLibClient {
    async fn fetch(&self, query: &LyricsQuery) -> Result<LyricsPayload, LookupError> {
        let url = self
            .base
            .join("get")
            .map_err(|e| LookupError::Transport(format!("bad lookup url: {e}")))?;
        let mut params = vec![
            ("track_name", query.title.clone()),
            ("artist_name", query.artist.clone()),
        ];
        if let Some(duration) = query.duration_secs {
            params.push(("duration", format!("{}", duration.round() as u64)));
        }

        tracing::debug!(%url, ?params, "lyrics.request");
        let resp = self.client.get(url).query(&params).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            Err(LookupError::NotFound)
        } else if !status.is_success() {
            tracing::debug!(%status, "lyrics.unsuccessful");
            Err(LookupError::NotFound)
        } else {
            resp.json::<LyricsPayload>().await.map_err(LookupError::from)
        }
    }
}
