//! Directory walking for imagededup.
//!
//! This crate finds candidate image files below the configured roots using
//! jwalk for parallel traversal, and defines the [`ProgressObserver`]
//! checkpoints the pipeline reports through.
//!
//! # Example
//!
//! ```rust,no_run
//! use imagededup_core::DedupConfig;
//! use imagededup_scan::FileWalker;
//!
//! let config = DedupConfig::new(vec!["/path/to/photos".into()]);
//! let walker = FileWalker::from_config(&config).unwrap();
//!
//! for file in walker.walk(&config.roots[0]).unwrap() {
//!     println!("{}", file.display());
//! }
//! ```

mod error;
mod progress;
mod walker;

pub use error::ScanError;
pub use progress::{LogObserver, Phase, ProgressObserver, SilentObserver};
pub use walker::{DirectoryFileCount, FileWalker};
