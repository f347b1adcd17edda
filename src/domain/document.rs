use std::fmt;

use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

use crate::domain::{StockItem, VersionTokens};

/// Store-assigned document identifier
#[nutype(
    validate(not_empty),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        Serialize,
        Deserialize,
        TryFrom,
        AsRef
    )
)]
pub struct DocumentId(String);

/// A point-in-time snapshot of a stored document
///
/// Valid only until the holder's own write: the tokens are whatever the
/// store reported at read time and go stale the moment anyone else
/// writes the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDocument {
    pub id: DocumentId,
    pub item: StockItem,
    pub version: VersionTokens,
}

impl fmt::Display for VersionedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "item: id={}, stock={}, {}",
            self.item.item_id, self.item.quantity, self.version
        )
    }
}
