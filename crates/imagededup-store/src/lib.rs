//! Reference [`SignatureStore`](imagededup_core::SignatureStore) for imagededup.
//!
//! [`MemoryStore`] keeps every record in a concurrent map and can persist it
//! as a JSON snapshot between runs. How files are turned into signatures and
//! how two signatures are compared is delegated to a [`Fingerprinter`]; the
//! bundled [`ContentFingerprinter`] treats byte-identical files as duplicates.

mod fingerprint;
mod memory;

pub use fingerprint::{ContentFingerprinter, Fingerprint, Fingerprinter};
pub use memory::MemoryStore;
