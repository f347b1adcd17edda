//! Property tests for the in-memory store's compare-and-swap contract

use proptest::prelude::*;

use stockroom::domain::{ItemId, SeqNo, StockItem, StockQuantity, VersionTokens};
use stockroom::store::{DocumentStore, MemoryStore, WriteOutcome};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
}

fn item(quantity: i64) -> StockItem {
    StockItem::new(ItemId::from(7), StockQuantity::from(quantity))
}

proptest! {
    /// Fresh-read conditional writes never conflict, and every
    /// successful write advances the sequence number.
    #[test]
    fn seq_nos_strictly_increase_over_successful_writes(
        deltas in proptest::collection::vec(-50i64..50, 1..20),
    ) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            store.seed(item(0)).await.unwrap();

            let mut seen: Vec<SeqNo> = Vec::new();
            for delta in deltas {
                let document = store.find_by_item_id(ItemId::from(7)).await.unwrap();
                let outcome = store
                    .upsert(
                        &document.id,
                        document.item.with_adjusted_quantity(delta),
                        Some(&document.version),
                    )
                    .await
                    .unwrap();

                match outcome {
                    WriteOutcome::Stored(version) => seen.push(version.seq_no),
                    WriteOutcome::VersionConflict => {
                        panic!("write with freshly read tokens conflicted")
                    }
                }
            }

            assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
        });
    }

    /// Tokens captured before other writes landed never mutate state.
    #[test]
    fn stale_tokens_never_mutate_state(
        later_writes in 1usize..5,
        stale_delta in 1i64..100,
    ) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            store.seed(item(0)).await.unwrap();
            let stale = store.find_by_item_id(ItemId::from(7)).await.unwrap();

            for _ in 0..later_writes {
                let current = store.find_by_item_id(ItemId::from(7)).await.unwrap();
                let outcome = store
                    .upsert(
                        &current.id,
                        current.item.with_adjusted_quantity(1),
                        Some(&current.version),
                    )
                    .await
                    .unwrap();
                assert!(!outcome.is_conflict());
            }

            let outcome = store
                .upsert(
                    &stale.id,
                    stale.item.with_adjusted_quantity(stale_delta),
                    Some(&stale.version),
                )
                .await
                .unwrap();
            assert!(outcome.is_conflict());

            let current = store.find_by_item_id(ItemId::from(7)).await.unwrap();
            assert_eq!(
                current.item.quantity,
                StockQuantity::from(later_writes as i64)
            );
        });
    }

    /// Writers that all read the same initial revision, then write in
    /// an arbitrary order with re-read-and-retry on conflict, each land
    /// their delta exactly once.
    #[test]
    fn retry_loop_applies_each_delta_exactly_once(
        deltas in proptest::collection::vec(1i64..20, 2..6),
    ) {
        runtime().block_on(async {
            let store = MemoryStore::new();
            store.seed(item(0)).await.unwrap();

            // Everyone reads before anyone writes, so all but the first
            // writer hold stale tokens.
            let mut snapshots: Vec<(i64, VersionTokens)> = Vec::new();
            let seeded = store.find_by_item_id(ItemId::from(7)).await.unwrap();
            for delta in &deltas {
                snapshots.push((*delta, seeded.version));
            }

            for (delta, mut tokens) in snapshots {
                loop {
                    let current = store.find_by_item_id(ItemId::from(7)).await.unwrap();
                    let outcome = store
                        .upsert(
                            &current.id,
                            current.item.with_adjusted_quantity(delta),
                            Some(&tokens),
                        )
                        .await
                        .unwrap();

                    match outcome {
                        WriteOutcome::Stored(_) => break,
                        WriteOutcome::VersionConflict => tokens = current.version,
                    }
                }
            }

            let total: i64 = deltas.iter().sum();
            let current = store.find_by_item_id(ItemId::from(7)).await.unwrap();
            assert_eq!(current.item.quantity, StockQuantity::from(total));
        });
    }
}
