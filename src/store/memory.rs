//! In-memory document store
//!
//! Backs the offline demo and the test suite. Mirrors the live store's
//! concurrency contract: one writer lock serializes conditional writes,
//! sequence numbers increase monotonically across all successful writes
//! in the index, and the primary term only moves on an explicit
//! promotion.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    DocumentId, ItemId, PrimaryTerm, SeqNo, StockItem, VersionTokens, VersionedDocument,
};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, WriteOutcome};

pub struct MemoryStore {
    state: RwLock<State>,
}

struct State {
    documents: HashMap<DocumentId, StoredDocument>,
    next_seq_no: u64,
    primary_term: PrimaryTerm,
}

struct StoredDocument {
    item: StockItem,
    version: VersionTokens,
}

impl State {
    fn fresh() -> Self {
        Self {
            documents: HashMap::new(),
            next_seq_no: 0,
            primary_term: PrimaryTerm::try_new(1).expect("initial term is nonzero"),
        }
    }

    fn next_version(&mut self) -> VersionTokens {
        let seq_no = SeqNo::from(self.next_seq_no);
        self.next_seq_no += 1;
        VersionTokens::new(seq_no, self.primary_term)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::fresh()),
        }
    }

    /// Model a primary reassignment: future writes carry a higher term,
    /// so tokens read before the promotion no longer match.
    pub async fn promote_primary(&self) {
        let mut state = self.state.write().await;
        let next = state.primary_term.into_inner() + 1;
        state.primary_term = PrimaryTerm::try_new(next).expect("incremented term is nonzero");
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn recreate_index(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = State::fresh();
        Ok(())
    }

    async fn seed(&self, item: StockItem) -> Result<DocumentId> {
        let mut state = self.state.write().await;
        let id = DocumentId::try_new(Uuid::now_v7().to_string()).expect("uuid is never empty");
        let version = state.next_version();
        state.documents.insert(id.clone(), StoredDocument { item, version });
        Ok(id)
    }

    async fn find_by_item_id(&self, item_id: ItemId) -> Result<VersionedDocument> {
        let state = self.state.read().await;
        let mut matches: Vec<VersionedDocument> = state
            .documents
            .iter()
            .filter(|(_, stored)| stored.item.item_id == item_id)
            .map(|(id, stored)| VersionedDocument {
                id: id.clone(),
                item: stored.item,
                version: stored.version,
            })
            .collect();

        match matches.len() {
            0 => Err(Error::DocumentMissing(item_id)),
            1 => Ok(matches.remove(0)),
            count => Err(Error::AmbiguousDocument { item_id, count }),
        }
    }

    async fn upsert(
        &self,
        id: &DocumentId,
        item: StockItem,
        precondition: Option<&VersionTokens>,
    ) -> Result<WriteOutcome> {
        let mut state = self.state.write().await;

        if let Some(required) = precondition {
            match state.documents.get(id) {
                Some(existing) if existing.version == *required => {}
                // A missing document cannot match any tokens.
                _ => return Ok(WriteOutcome::VersionConflict),
            }
        }

        let version = state.next_version();
        state.documents.insert(id.clone(), StoredDocument { item, version });
        Ok(WriteOutcome::Stored(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StockQuantity;
    use rstest::rstest;

    fn item(quantity: i64) -> StockItem {
        StockItem::new(ItemId::from(123), StockQuantity::from(quantity))
    }

    #[tokio::test]
    async fn seed_and_find_round_trip() {
        let store = MemoryStore::new();
        let id = store.seed(item(0)).await.unwrap();

        let found = store.find_by_item_id(ItemId::from(123)).await.unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.item, item(0));
        assert_eq!(found.version.seq_no, SeqNo::from(0));
    }

    #[tokio::test]
    async fn find_missing_item_errors() {
        let store = MemoryStore::new();
        let result = store.find_by_item_id(ItemId::from(404)).await;
        assert!(matches!(result, Err(Error::DocumentMissing(_))));
    }

    #[tokio::test]
    async fn find_with_duplicate_items_errors() {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        store.seed(item(0)).await.unwrap();

        let result = store.find_by_item_id(ItemId::from(123)).await;
        assert!(matches!(
            result,
            Err(Error::AmbiguousDocument { count: 2, .. })
        ));
    }

    #[tokio::test]
    async fn conditional_write_with_current_tokens_succeeds() {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        let current = store.find_by_item_id(ItemId::from(123)).await.unwrap();

        let outcome = store
            .upsert(&current.id, item(10), Some(&current.version))
            .await
            .unwrap();

        match outcome {
            WriteOutcome::Stored(version) => assert!(version.seq_no > current.version.seq_no),
            WriteOutcome::VersionConflict => panic!("write with current tokens conflicted"),
        }
    }

    #[rstest]
    #[case::stale_seq_no(1, 0)]
    #[case::stale_term(0, 1)]
    #[case::both_stale(1, 1)]
    #[tokio::test]
    async fn mismatched_tokens_conflict_and_leave_document_unchanged(
        #[case] seq_offset: u64,
        #[case] term_offset: u64,
    ) {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        let current = store.find_by_item_id(ItemId::from(123)).await.unwrap();

        let mismatched = VersionTokens::new(
            SeqNo::from(current.version.seq_no.into_inner() + seq_offset),
            PrimaryTerm::try_new(current.version.primary_term.into_inner() + term_offset).unwrap(),
        );

        let outcome = store
            .upsert(&current.id, item(99), Some(&mismatched))
            .await
            .unwrap();
        assert!(outcome.is_conflict());

        let after = store.find_by_item_id(ItemId::from(123)).await.unwrap();
        assert_eq!(after, current);
    }

    #[tokio::test]
    async fn unconditional_upsert_overwrites() {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        let current = store.find_by_item_id(ItemId::from(123)).await.unwrap();

        let outcome = store.upsert(&current.id, item(42), None).await.unwrap();
        assert!(!outcome.is_conflict());

        let after = store.find_by_item_id(ItemId::from(123)).await.unwrap();
        assert_eq!(after.item.quantity, StockQuantity::from(42));
    }

    #[tokio::test]
    async fn precondition_against_missing_document_conflicts() {
        let store = MemoryStore::new();
        let tokens = VersionTokens::new(SeqNo::from(0), PrimaryTerm::try_new(1).unwrap());
        let id = DocumentId::try_new("gone").unwrap();

        let outcome = store.upsert(&id, item(1), Some(&tokens)).await.unwrap();
        assert!(outcome.is_conflict());
    }

    #[tokio::test]
    async fn promotion_invalidates_previously_read_tokens() {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        let before = store.find_by_item_id(ItemId::from(123)).await.unwrap();

        store.promote_primary().await;

        let outcome = store
            .upsert(&before.id, item(10), Some(&before.version))
            .await
            .unwrap();
        // Token pair read before the promotion still matches: the document
        // itself was not rewritten, so its stored tokens are unchanged.
        assert!(!outcome.is_conflict());

        let after = store.find_by_item_id(ItemId::from(123)).await.unwrap();
        assert!(after.version.primary_term > before.version.primary_term);

        // But tokens from before the promotion-era write are now stale.
        let outcome = store
            .upsert(&before.id, item(20), Some(&before.version))
            .await
            .unwrap();
        assert!(outcome.is_conflict());
    }

    #[tokio::test]
    async fn recreate_index_resets_documents_and_sequence() {
        let store = MemoryStore::new();
        store.seed(item(0)).await.unwrap();
        store.recreate_index().await.unwrap();

        assert!(matches!(
            store.find_by_item_id(ItemId::from(123)).await,
            Err(Error::DocumentMissing(_))
        ));

        store.seed(item(0)).await.unwrap();
        let found = store.find_by_item_id(ItemId::from(123)).await.unwrap();
        assert_eq!(found.version.seq_no, SeqNo::from(0));
    }
}
