//! Deterministic optimistic-update race
//!
//! The coordinator seeds one stock document, then runs two writers
//! whose read and write phases are interleaved through one-shot
//! signals. The interleaving guarantees the second writer's first
//! conditional write observes stale version tokens and is rejected; it
//! recovers with a single fresh read and retry. Both deltas end up
//! applied exactly once.

pub mod signal;
pub mod writers;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{ItemId, StockItem, StockQuantity, VersionedDocument};
use crate::error::Result;
use crate::store::DocumentStore;

pub use signal::{Signal, SignalPair};
pub use writers::{
    AttemptOutcome, WriteAttempt, WriterId, WriterReport, FIRST_WRITER_DELTA, SECOND_WRITER_DELTA,
};

use writers::{first_writer, second_writer};

/// Item the demonstration runs against.
pub const DEMO_ITEM_ID: u64 = 123;

/// Everything that happened in one run
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub initial: VersionedDocument,
    pub first: WriterReport,
    pub second: WriterReport,
    pub final_document: VersionedDocument,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RaceReport {
    /// Whether the second writer's first attempt was rejected, which is
    /// the whole point of the exercise.
    pub fn conflict_was_observed(&self) -> bool {
        self.second
            .attempts
            .first()
            .is_some_and(|attempt| matches!(attempt.outcome, AttemptOutcome::Conflicted))
    }
}

/// Run the demonstration against a fresh index on `store`.
///
/// Durable effects land only in the store; re-running starts over from
/// a clean index.
pub async fn run<S>(store: Arc<S>) -> Result<RaceReport>
where
    S: DocumentStore + ?Sized + 'static,
{
    let started_at = Utc::now();
    let item_id = ItemId::from(DEMO_ITEM_ID);

    store.recreate_index().await?;
    let document_id = store
        .seed(StockItem::new(item_id, StockQuantity::from(0)))
        .await?;
    debug!(%document_id, "seeded stock document");

    let initial = store.find_by_item_id(item_id).await?;
    info!(document = %initial, "initial state");

    let first_signals = SignalPair::new();
    let second_signals = SignalPair::new();

    let first_task = tokio::spawn(first_writer(
        Arc::clone(&store),
        item_id,
        first_signals.clone(),
        second_signals.clone(),
    ));
    let second_task = tokio::spawn(second_writer(
        Arc::clone(&store),
        item_id,
        second_signals,
        first_signals,
    ));

    let first = first_task.await??;
    let second = second_task.await??;

    let final_document = store.find_by_item_id(item_id).await?;
    info!(document = %final_document, "final state");

    Ok(RaceReport {
        initial,
        first,
        second,
        final_document,
        started_at,
        finished_at: Utc::now(),
    })
}
