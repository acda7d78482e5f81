use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
///
/// `Config` and `DataDir` cover missing or malformed local state (artifacts,
/// vocabulary, credentials); they abort the invocation before anything is
/// written. `Backend` and `Http` cover failed or unusable responses from the
/// embedding/chat services; they are fatal for the invocation and never
/// retried. Unusable oracle output is not an error; filtering degrades to an
/// empty tag list instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}
