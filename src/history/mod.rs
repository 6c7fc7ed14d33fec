//! Run history for change detection
//!
//! Remembers, per workspace and target artifact, which plugin binaries the
//! last successful run used and what the artifact and manifests looked like
//! afterwards. The staleness gate compares against this record.
//!
//! # Signatures
//!
//! | Input | Signature |
//! |-------|-----------|
//! | Plugin binary | SHA-256 of contents, 16 hex chars |
//! | Target artifact | same, taken after the plugins ran |
//! | Manifest | same, one entry per manifest that existed |

pub mod signature;
pub mod store;

pub use signature::{file_signature, file_signature_if_exists};
pub use store::{HistoryRecord, HistoryStore};
