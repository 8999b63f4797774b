//! One-way trail fingerprints.
//!
//! fingerprint = BLAKE3-keyed(salt, "hive/pheromone/v1" ‖ len(agent) ‖ agent ‖ buckets)
//!
//! The salt is a per-node secret, so a fingerprint is stable for
//! deduplication on that node but cannot be recomputed, and so cannot be
//! linked back to an agent, by anyone who lacks the salt.

use crate::error::{PheromoneError, Result};
use crate::BucketedMetrics;
use serde::{Deserialize, Serialize};

const DOMAIN: &[u8] = b"hive/pheromone/v1";

/// A 32-byte trail fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

impl From<Fingerprint> for String {
    fn from(f: Fingerprint) -> Self {
        f.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 hex chars
        write!(f, "{}...", &self.to_hex()[..8])
    }
}

/// Computes fingerprints under a secret salt.
#[derive(Clone)]
pub struct Fingerprinter {
    salt: [u8; 32],
}

impl Fingerprinter {
    pub fn new(salt: [u8; 32]) -> Self {
        Self { salt }
    }

    /// Fresh random salt. Fingerprints will not match across restarts.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    /// Salt from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut salt = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut salt)
            .map_err(|e| PheromoneError::InvalidInput(format!("fingerprint salt: {}", e)))?;
        Ok(Self::new(salt))
    }

    pub fn fingerprint(&self, agent: &str, metrics: &BucketedMetrics) -> Fingerprint {
        let mut hasher = blake3::Hasher::new_keyed(&self.salt);
        hasher.update(DOMAIN);
        hasher.update(&(agent.len() as u64).to_le_bytes());
        hasher.update(agent.as_bytes());
        hasher.update(&metrics.canonical_bytes());
        Fingerprint(*hasher.finalize().as_bytes())
    }
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter").field("salt", &"<redacted>").finish()
    }
}
