//! Agent identity.
//!
//! An `AgentId` is the stable, opaque name of one agent instance. It is
//! usually derived from the agent's ed25519 public key with double-BLAKE3
//! (`b3b3/<hex>`), but any validated string is accepted so agents that bring
//! their own naming scheme can still join.

use crate::error::{MembershipError, Result};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

/// Longest accepted identity, in bytes.
pub const MAX_AGENT_ID_LEN: usize = 128;

/// Stable identifier of one agent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    /// Validate and wrap an identity string.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(MembershipError::InvalidInput("agent id is empty".into()));
        }
        if id.len() > MAX_AGENT_ID_LEN {
            return Err(MembershipError::InvalidInput(format!(
                "agent id longer than {} bytes",
                MAX_AGENT_ID_LEN
            )));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(MembershipError::InvalidInput(
                "agent id contains whitespace or control characters".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Derive the identity of an ed25519 key.
    ///
    /// hash₁ = BLAKE3(pubkey), hash₂ = BLAKE3(hash₁), id = "b3b3/{hash₂}"
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        Self::from_public_key_bytes(key.as_bytes())
    }

    /// Derive the identity from raw public key bytes.
    pub fn from_public_key_bytes(pubkey: &[u8]) -> Self {
        let hash1 = blake3::hash(pubkey);
        let hash2 = blake3::hash(hash1.as_bytes());
        Self(format!("b3b3/{}", hex::encode(hash2.as_bytes())))
    }

    /// Check that this identity was derived from `key`.
    pub fn matches_key(&self, key: &VerifyingKey) -> bool {
        *self == Self::from_public_key(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = MembershipError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for AgentId {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn rejects_malformed_ids() {
        assert!(AgentId::new("").is_err());
        assert!(AgentId::new("has space").is_err());
        assert!(AgentId::new("tab\there").is_err());
        assert!(AgentId::new("x".repeat(MAX_AGENT_ID_LEN + 1)).is_err());
        assert!(AgentId::new("x".repeat(MAX_AGENT_ID_LEN)).is_ok());
    }

    #[test]
    fn key_derived_id_is_stable() {
        let key = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        let a = AgentId::from_public_key(&key);
        let b = AgentId::from_public_key(&key);

        assert_eq!(a, b);
        assert!(a.as_str().starts_with("b3b3/"));
        assert_eq!(a.as_str().len(), 5 + 64);
        assert!(a.matches_key(&key));

        let other = SigningKey::from_bytes(&[8u8; 32]).verifying_key();
        assert!(!a.matches_key(&other));
    }

    #[test]
    fn deserialization_validates() {
        let ok: std::result::Result<AgentId, _> = serde_json::from_str("\"agent-a\"");
        assert_eq!(ok.unwrap().as_str(), "agent-a");

        let bad: std::result::Result<AgentId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
