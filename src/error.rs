//! Error types for the ingestion core.
//!
//! Each failure class is contained to the smallest unit of work: a
//! [`FetchError`] skips one source for a cycle, a [`ScoringError`] skips one
//! item, a [`StoreError`] loses one write. None of them stop the scheduler.

use thiserror::Error;

/// A connector failed to produce its batch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{source_name}: request failed: {cause}")]
    Transport {
        source_name: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("{source_name}: unexpected status {status} from {url}")]
    Status {
        source_name: String,
        url: String,
        status: u16,
    },

    #[error("{source_name}: malformed payload: {message}")]
    Parse {
        source_name: String,
        message: String,
    },
}

impl FetchError {
    /// Name of the source whose batch failed.
    pub fn source_name(&self) -> &str {
        match self {
            FetchError::Transport { source_name, .. }
            | FetchError::Status { source_name, .. }
            | FetchError::Parse { source_name, .. } => source_name,
        }
    }
}

/// The scoring service could not produce a usable result.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("scoring API key is not configured")]
    MissingApiKey,

    #[error("scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scoring API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scoring service error: {0}")]
    Remote(String),

    #[error("empty response from scoring service")]
    EmptyResponse,

    #[error("failed to parse score JSON: {cause}, content: {content}")]
    Parse { content: String, cause: String },
}

/// Durable storage failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Another writer already stored this URL.
    #[error("item already exists: {url}")]
    UniqueViolation { url: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure of the ask operation.
#[derive(Error, Debug)]
pub enum AskError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("item not found: {0}")]
    NotFound(i64),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
