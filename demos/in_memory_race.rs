//! The optimistic-update race against the in-memory store
//!
//! Runs the exact choreography the live binary runs, with no external
//! store needed, then replays the rejected write to show that stale
//! tokens keep failing until the writer re-reads.

use std::sync::Arc;

use stockroom::race;
use stockroom::store::{DocumentStore, MemoryStore, WriteOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Optimistic-update race, in-memory edition\n");

    let store = Arc::new(MemoryStore::new());
    let report = race::run(Arc::clone(&store)).await?;

    println!("initial: {}", report.initial);
    for writer in [&report.first, &report.second] {
        for attempt in &writer.attempts {
            println!(
                "{} writer: observed {} -> {}",
                writer.writer, attempt.observed, attempt.outcome
            );
        }
    }
    println!("final:   {}", report.final_document);

    // A stale write is still a stale write: replaying the rejected
    // attempt keeps conflicting until the writer re-reads.
    let stale = report.second.attempts[0].observed;
    let replayed = store
        .upsert(
            &report.final_document.id,
            report.final_document.item,
            Some(&stale),
        )
        .await?;
    match replayed {
        WriteOutcome::VersionConflict => {
            println!("\nreplaying the rejected write with tokens ({stale}): still conflicts")
        }
        WriteOutcome::Stored(_) => unreachable!("stale tokens must not be accepted"),
    }

    Ok(())
}
