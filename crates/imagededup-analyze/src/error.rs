//! Error types for ranking and selection.

use thiserror::Error;

/// Errors raised while resolving a duplicate group.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    /// A group must contain at least one record.
    #[error("Cannot rank an empty duplicate group")]
    EmptyGroup,
}
