use thiserror::Error;

/// Failure modes of a single lyrics lookup.
///
/// Nothing here escapes the loader: every variant is folded into a
/// [`FetchStatus`](crate::event::FetchStatus) before it reaches the display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no lyrics matched the query")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LookupError::Decode(e.to_string())
        } else {
            LookupError::Transport(e.to_string())
        }
    }
}
