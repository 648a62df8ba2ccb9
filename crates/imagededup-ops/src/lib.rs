//! File actions for imagededup.
//!
//! This crate applies the outcome of duplicate resolution to disk: deleting
//! or moving inferior copies (with a content comparison when a move target
//! is already occupied), and finding the folders that became empty as a
//! result.

mod compare;
mod error;
mod executor;
mod move_op;
mod reclaim;

pub use compare::{content_hash, same_content};
pub use error::OpsError;
pub use executor::{ActionExecutor, ActionOutcome};
pub use move_op::{MoveOutcome, mirror_destination, move_file};
pub use reclaim::{EmptyFolderReclaimer, EmptyFolderSet, ReclaimReport};
