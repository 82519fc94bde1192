//! # Error Taxonomy
//!
//! Every fallible operation in this crate returns [`PlanError`]. Variants fall into
//! two classes, reported by [`PlanError::kind`]:
//!
//! - **Invariant violations**: the plan machinery itself reached an inconsistent
//!   state (a parent evaluated before its child, a join attribute that no longer
//!   lives in any chain). These are bugs, never recovered from.
//! - **Invalid input**: the caller supplied something the model cannot score, such as
//!   an unknown relation or attribute, or a zero value count divided into a non-empty
//!   input.
//!
//! A cardinality or value count that reaches zero during estimation is not an error:
//! it describes an empty relation and propagates as zero.

use crate::plan::NodeId;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PlanError> = std::result::Result<T, E>;

/// Coarse classification of a [`PlanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvariantViolation,
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("node {0} was evaluated before its inputs were estimated")]
    MissingOutput(NodeId),

    #[error("attribute `{0}` does not resolve to any remaining chain")]
    UnresolvedAttribute(String),

    #[error("unknown relation `{0}`")]
    UnknownRelation(String),

    #[error("relation `{0}` already exists")]
    DuplicateRelation(String),

    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),

    #[error("attribute `{attribute}` already exists in relation `{relation}`")]
    DuplicateAttribute { relation: String, attribute: String },

    #[error("attribute `{0}` is present in more than one input")]
    AmbiguousAttribute(String),

    #[error("attribute `{0}` has a value count of zero but its input is not empty")]
    ZeroValueCount(String),

    #[error("join predicate `{0}` must compare two attributes")]
    InvalidJoinPredicate(String),

    #[error("estimated cardinality overflows 64 bits")]
    Overflow,

    #[error("plan contains no scan")]
    NoScans,

    #[error("{count} join predicates exceed the search limit of {limit}")]
    TooManyPredicates { count: usize, limit: usize },
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::MissingOutput(_) | PlanError::UnresolvedAttribute(_) => {
                ErrorKind::InvariantViolation
            }
            _ => ErrorKind::InvalidInput,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::InvariantViolation
    }
}
