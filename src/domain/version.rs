//! Store-assigned concurrency tokens
//!
//! Every successful write leaves the document with a fresh sequence
//! number; the primary term only moves when the store reassigns the
//! primary. A conditional write must present the exact pair it last
//! read, so either component going stale is enough to be rejected.

use std::fmt;

use nutype::nutype;
#[allow(unused_imports)] // These are used by nutype derive macros
use serde::{Deserialize, Serialize};

/// Monotonically increasing revision counter
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize,
    From,
    AsRef
))]
pub struct SeqNo(u64);

/// Authority epoch of the primary that accepted the revision, always >= 1
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Display,
        Serialize,
        Deserialize,
        TryFrom,
        AsRef
    )
)]
pub struct PrimaryTerm(u64);

/// The compare-and-swap key of a document revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTokens {
    pub seq_no: SeqNo,
    pub primary_term: PrimaryTerm,
}

impl VersionTokens {
    pub fn new(seq_no: SeqNo, primary_term: PrimaryTerm) -> Self {
        Self {
            seq_no,
            primary_term,
        }
    }
}

impl fmt::Display for VersionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seq_no={}, primary_term={}",
            self.seq_no, self.primary_term
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_term_rejects_zero() {
        assert!(PrimaryTerm::try_new(0).is_err());
        assert!(PrimaryTerm::try_new(1).is_ok());
    }

    #[test]
    fn tokens_compare_by_both_components() {
        let term_one = PrimaryTerm::try_new(1).unwrap();
        let term_two = PrimaryTerm::try_new(2).unwrap();

        let current = VersionTokens::new(SeqNo::from(4), term_one);
        assert_eq!(current, VersionTokens::new(SeqNo::from(4), term_one));
        assert_ne!(current, VersionTokens::new(SeqNo::from(5), term_one));
        assert_ne!(current, VersionTokens::new(SeqNo::from(4), term_two));
    }

    #[test]
    fn tokens_display_both_components() {
        let tokens = VersionTokens::new(SeqNo::from(7), PrimaryTerm::try_new(2).unwrap());
        assert_eq!(tokens.to_string(), "seq_no=7, primary_term=2");
    }
}
