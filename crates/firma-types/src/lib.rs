//! Firma core types - documents, signatories, and the signing lifecycle.
//!
//! Everything persisted by the signing workflow lives here. The signing
//! progression is an explicit [`SigningState`] derived from persisted
//! fields, so the state machine can be audited and tested apart from
//! storage.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod document;
mod ids;
mod signatory;

pub use document::*;
pub use ids::*;
pub use signatory::*;
