//! Core types and traits for imagededup.
//!
//! This crate provides the data structures shared by every other crate in
//! the workspace: file records as returned by a signature store, the
//! per-path [`Action`] enum, the run configuration and the
//! [`SignatureStore`] trait that hides the similarity backend.

mod config;
mod error;
mod record;
mod rules;
mod store;

pub use config::{
    DaemonConfig, DedupConfig, DedupConfigBuilder, DedupConfigBuilderError, ObserverKind,
    non_overlapping_roots, parse_duration,
};
pub use error::{ConfigError, StoreError};
pub use record::{Action, DATA_MODEL_VERSION, FileMetadata, FileRecord};
pub use rules::PrioritizationRule;
pub use store::{RecordIter, SignatureStore};
