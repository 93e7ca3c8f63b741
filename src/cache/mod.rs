// src/cache/mod.rs

//! Content-based caching: deterministic fingerprints over process inputs and
//! the exclusive claim used around cache lookup-then-insert.

pub mod claims;
pub mod hash;

pub use claims::{FingerprintClaim, FingerprintClaims};
pub use hash::{data_node_hash, process_fingerprint, value_hash};
