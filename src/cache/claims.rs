// src/cache/claims.rs

//! Exclusive in-process claims on cache fingerprints.
//!
//! The cache lookup-then-insert for a given fingerprint is a critical
//! section: without a claim, two concurrent processes with equal inputs
//! could both miss the cache and both execute. A claim is taken before the
//! lookup and held until the result is recorded (terminal state), so a
//! second process with the same fingerprint either finds the sealed result
//! or executes as a tolerated duplicate when the claim is contended.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

#[derive(Default, Clone)]
pub struct FingerprintClaims {
    claimed: Arc<Mutex<HashSet<String>>>,
}

impl FingerprintClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim a fingerprint exclusively.
    ///
    /// Returns `None` if another live process already holds the claim; the
    /// caller then executes normally, accepting duplicate execution rather
    /// than blocking an async driver.
    pub fn try_claim(&self, fingerprint: &str) -> Option<FingerprintClaim> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        if !claimed.insert(fingerprint.to_string()) {
            debug!(fingerprint, "fingerprint already claimed; duplicate execution tolerated");
            return None;
        }
        Some(FingerprintClaim {
            claims: self.claimed.clone(),
            fingerprint: fingerprint.to_string(),
        })
    }
}

/// RAII guard for a claimed fingerprint; releases the claim on drop.
pub struct FingerprintClaim {
    claims: Arc<Mutex<HashSet<String>>>,
    fingerprint: String,
}

impl Drop for FingerprintClaim {
    fn drop(&mut self) {
        let mut claimed = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        claimed.remove(&self.fingerprint);
    }
}
