//! Firma storage abstractions.
//!
//! The signing workflow runs as independent concurrent signer sessions
//! over shared persistent storage, so every mutation that must be
//! exactly-once goes through an explicit conditional update on these
//! traits. The in-memory adapter is the deterministic reference
//! implementation; a transactional backend is the production
//! source of truth and must give `mark_submitted` plus the paired audit
//! append one transaction boundary.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod blob;
mod error;
mod memory;
mod traits;

pub use blob::MemoryBlobStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemorySigningStorage;
pub use traits::{BlobStore, DocumentStore, SignatoryStore, SigningStorage};
