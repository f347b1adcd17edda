//! Versioned document storage
//!
//! The external store owns all durable state and serializes conditional
//! writes per document. [`DocumentStore`] is the minimal contract the
//! demonstration needs: any store with compare-and-swap semantics on a
//! versioned record satisfies it.

pub mod elasticsearch;
pub mod memory;

use async_trait::async_trait;
use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

use crate::domain::{DocumentId, ItemId, StockItem, VersionTokens, VersionedDocument};
use crate::error::Result;

pub use elasticsearch::ElasticsearchStore;
pub use memory::MemoryStore;

/// Name of the index holding stock documents
///
/// Restricted to what the store accepts in a URL path without quoting
/// surprises: lowercase alphanumerics, `_` and `-`, not starting with
/// either separator.
#[nutype(
    validate(
        not_empty,
        len_char_max = 255,
        predicate = |name: &str| {
            name.chars().next().is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        },
    ),
    derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize, TryFrom, AsRef)
)]
pub struct IndexName(String);

/// Result of a write the store accepted for processing
///
/// A rejected precondition is an outcome, not an error: the caller
/// decides whether a conflict was expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document now carries these tokens.
    Stored(VersionTokens),
    /// The supplied tokens no longer match; the document is unchanged.
    VersionConflict,
}

impl WriteOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteOutcome::VersionConflict)
    }
}

/// Store of versioned stock documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Drop the index if it exists and create it fresh.
    async fn recreate_index(&self) -> Result<()>;

    /// Index a new document without precondition, immediately visible
    /// to searches. Returns the id the store assigned.
    async fn seed(&self, item: StockItem) -> Result<DocumentId>;

    /// Term query by item id, returning the single matching document
    /// together with its current version tokens.
    async fn find_by_item_id(&self, item_id: ItemId) -> Result<VersionedDocument>;

    /// Write a document, optionally guarded by the version tokens the
    /// caller last read. `None` is a plain upsert.
    async fn upsert(
        &self,
        id: &DocumentId,
        item: StockItem,
        precondition: Option<&VersionTokens>,
    ) -> Result<WriteOutcome>;
}
