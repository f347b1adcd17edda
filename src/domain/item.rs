use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

/// Warehouse item identifier, the term the store is queried by
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    Serialize,
    Deserialize,
    From,
    AsRef
))]
pub struct ItemId(u64);

/// Units of an item on hand
///
/// Signed so an oversold position is representable instead of silently
/// clamped.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
    From,
    AsRef
))]
pub struct StockQuantity(i64);

impl StockQuantity {
    /// Quantity after receiving (positive) or shipping (negative) units.
    pub fn adjusted(self, delta: i64) -> Self {
        Self::new(self.into_inner() + delta)
    }
}

/// Application payload of a stock document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    #[serde(rename = "id")]
    pub item_id: ItemId,
    #[serde(rename = "stock")]
    pub quantity: StockQuantity,
}

impl StockItem {
    pub fn new(item_id: ItemId, quantity: StockQuantity) -> Self {
        Self { item_id, quantity }
    }

    /// Copy of the item with `delta` units applied.
    pub fn with_adjusted_quantity(self, delta: i64) -> Self {
        Self {
            item_id: self.item_id,
            quantity: self.quantity.adjusted(delta),
        }
    }
}
