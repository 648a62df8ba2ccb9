//! Duplicate group resolution for imagededup.
//!
//! - **Ranking** - order a group of mutually similar records by configured
//!   prioritization rules, most preferred first
//! - **Selection** - split a ranked group into the copies to keep and the
//!   copies to remove, honoring the modification time window
//!
//! ```rust,ignore
//! use imagededup_analyze::{CandidateSelector, ProcessedSet, Ranker};
//! use imagededup_core::PrioritizationRule;
//!
//! let ranker = Ranker::new(&PrioritizationRule::defaults());
//! let ranked = ranker.rank(records)?;
//!
//! let mut processed = ProcessedSet::new();
//! let selection = CandidateSelector::new(None).select(ranked, &mut processed)?;
//! println!("keeping {}", selection.kept().path.display());
//! ```

mod error;
mod ranking;
mod selection;

pub use error::RankError;
pub use ranking::{Ranker, SortKey, key_for};
pub use selection::{CandidateSelector, ProcessedSet, Selection};
