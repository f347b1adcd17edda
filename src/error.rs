use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::domain::ItemId;
use crate::race::WriterId;

/// Stockroom error types
///
/// A version conflict on a conditional write is not an error: it is the
/// [`WriteOutcome::VersionConflict`](crate::store::WriteOutcome) variant,
/// because the second writer's first conflict is the designed path.
/// Everything here is fatal for the demonstration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid index name: {0}")]
    InvalidIndexName(String),

    #[error("Invalid store URI: {0}")]
    InvalidUri(String),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("Hyper error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store responded with {status}: {body}")]
    Store { status: StatusCode, body: String },

    #[error("Malformed store response: {0}")]
    InvalidResponse(String),

    #[error("Store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("No document found for item {0}")]
    DocumentMissing(ItemId),

    #[error("Expected exactly one document for item {item_id}, found {count}")]
    AmbiguousDocument { item_id: ItemId, count: usize },

    #[error("{writer} writer hit a version conflict on its only write")]
    UnexpectedConflict { writer: WriterId },

    #[error("A stale conditional write was accepted; the first writer's update was lost")]
    LostUpdate,

    #[error("Conditional write conflicted again after a fresh read")]
    ConflictOnRetry,

    #[error("Writer task failed: {0}")]
    WriterTask(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
