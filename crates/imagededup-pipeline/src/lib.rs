//! Batch pipeline for imagededup.
//!
//! A [`Pipeline`] runs six phases in order, each finishing before the next
//! starts:
//!
//! 1. **Cleanup** - drop store records that are outdated or point at
//!    missing files
//! 2. **Count** - count candidate files per root
//! 3. **Analyze** - add every candidate to the signature store, in parallel
//! 4. **Discover** - resolve duplicate groups one reference file at a time
//! 5. **Act** - delete or move the inferior copies
//! 6. **Reclaim** - remove folders emptied by phase 5
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use imagededup_core::DedupConfig;
//! use imagededup_pipeline::{Pipeline, RunOptions};
//! use imagededup_store::{ContentFingerprinter, MemoryStore};
//!
//! let config = DedupConfig::new(vec!["/photos".into()]);
//! let store = Arc::new(MemoryStore::new(ContentFingerprinter));
//! let pipeline = Pipeline::new(config, store).unwrap();
//!
//! let result = pipeline.run(&RunOptions::default()).unwrap();
//! println!("{:?}", result.summary());
//! ```

mod error;
mod pipeline;
mod result;

pub use error::PipelineError;
pub use pipeline::{AnalyzeReport, Pipeline, RunOptions, RunOptionsBuilder};
pub use result::{ActionFailure, DuplicateGroup, RunResult, RunSummary};
