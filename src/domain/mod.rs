//! Domain types for versioned stock documents

pub mod document;
pub mod item;
pub mod version;

pub use document::{DocumentId, VersionedDocument};
pub use item::{ItemId, StockItem, StockQuantity};
pub use version::{PrimaryTerm, SeqNo, VersionTokens};
