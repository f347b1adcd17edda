//! The two racing writers
//!
//! Both perform read, mutate in memory, conditional write. The signal
//! choreography pins the interleaving: the first writer reads, then the
//! second reads the same revision, then the first writes, and only then
//! is the second allowed to write. Its tokens are stale by
//! construction, so its first attempt is always rejected and it must
//! re-read before the retry.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::{ItemId, VersionTokens};
use crate::error::{Error, Result};
use crate::race::signal::SignalPair;
use crate::store::{DocumentStore, WriteOutcome};

/// Units the first writer adds to the stock.
pub const FIRST_WRITER_DELTA: i64 = 10;
/// Units the second writer adds, applied once per attempt but durable
/// exactly once.
pub const SECOND_WRITER_DELTA: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WriterId {
    First,
    Second,
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterId::First => write!(f, "first"),
            WriterId::Second => write!(f, "second"),
        }
    }
}

/// One conditional write, with the tokens the feeding read observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAttempt {
    pub observed: VersionTokens,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The write was accepted and the document now carries these tokens.
    Applied(VersionTokens),
    /// The observed tokens were stale and the write was rejected.
    Conflicted,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Applied(version) => write!(f, "applied ({version})"),
            AttemptOutcome::Conflicted => write!(f, "conflicted"),
        }
    }
}

/// What one writer did, attempt by attempt
#[derive(Debug, Clone)]
pub struct WriterReport {
    pub writer: WriterId,
    pub attempts: Vec<WriteAttempt>,
}

impl WriterReport {
    /// Tokens left behind by this writer's successful write, if any.
    pub fn applied_tokens(&self) -> Option<VersionTokens> {
        self.attempts.iter().find_map(|attempt| match attempt.outcome {
            AttemptOutcome::Applied(version) => Some(version),
            AttemptOutcome::Conflicted => None,
        })
    }
}

/// Non-conflicting path: reads first, writes first. Its single
/// conditional write always succeeds because nobody else has written
/// between its read and its write.
pub(crate) async fn first_writer<S>(
    store: Arc<S>,
    item_id: ItemId,
    ours: SignalPair,
    peer: SignalPair,
) -> Result<WriterReport>
where
    S: DocumentStore + ?Sized,
{
    let snapshot = store.find_by_item_id(item_id).await?;
    info!(writer = %WriterId::First, document = %snapshot, "read current revision");
    ours.searched.set();
    peer.searched.wait().await;

    let mutated = snapshot.item.with_adjusted_quantity(FIRST_WRITER_DELTA);
    match store
        .upsert(&snapshot.id, mutated, Some(&snapshot.version))
        .await?
    {
        WriteOutcome::Stored(version) => {
            info!(writer = %WriterId::First, %version, "conditional write applied");
            ours.updated.set();

            Ok(WriterReport {
                writer: WriterId::First,
                attempts: vec![WriteAttempt {
                    observed: snapshot.version,
                    outcome: AttemptOutcome::Applied(version),
                }],
            })
        }
        WriteOutcome::VersionConflict => Err(Error::UnexpectedConflict {
            writer: WriterId::First,
        }),
    }
}

/// Conflicting path: reads before the first writer's write, writes
/// after it. The first conditional write must be rejected; recovery is
/// one fresh read followed by one retry.
pub(crate) async fn second_writer<S>(
    store: Arc<S>,
    item_id: ItemId,
    ours: SignalPair,
    peer: SignalPair,
) -> Result<WriterReport>
where
    S: DocumentStore + ?Sized,
{
    peer.searched.wait().await;
    let stale = store.find_by_item_id(item_id).await?;
    info!(writer = %WriterId::Second, document = %stale, "read current revision");
    ours.searched.set();
    peer.updated.wait().await;

    let mut attempts = Vec::with_capacity(2);

    let mutated = stale.item.with_adjusted_quantity(SECOND_WRITER_DELTA);
    match store.upsert(&stale.id, mutated, Some(&stale.version)).await? {
        WriteOutcome::Stored(_) => return Err(Error::LostUpdate),
        WriteOutcome::VersionConflict => {
            info!(
                writer = %WriterId::Second,
                observed = %stale.version,
                "conditional write rejected, re-reading current revision"
            );
            attempts.push(WriteAttempt {
                observed: stale.version,
                outcome: AttemptOutcome::Conflicted,
            });
        }
    }

    let fresh = store.find_by_item_id(item_id).await?;
    info!(writer = %WriterId::Second, document = %fresh, "re-read current revision");

    let mutated = fresh.item.with_adjusted_quantity(SECOND_WRITER_DELTA);
    match store.upsert(&fresh.id, mutated, Some(&fresh.version)).await? {
        WriteOutcome::Stored(version) => {
            info!(writer = %WriterId::Second, %version, "conditional write applied on retry");
            attempts.push(WriteAttempt {
                observed: fresh.version,
                outcome: AttemptOutcome::Applied(version),
            });
            ours.updated.set();

            Ok(WriterReport {
                writer: WriterId::Second,
                attempts,
            })
        }
        WriteOutcome::VersionConflict => Err(Error::ConflictOnRetry),
    }
}
