use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::{Identity, Organization};
use crate::storage::SessionStorage;
use crate::utils::token_fingerprint;

pub const IDENTITY_CACHE_KEY: &str = "ferdi_identity_cache";

/// Identity and organization cached as one record, so they expire and vanish together.
/// The record is bound to the token that fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub token_fingerprint: String,
    pub identity: Identity,
    pub organization: Organization,
}

#[derive(Debug, Clone)]
pub struct CredentialCache {
    storage: SessionStorage,
    ttl: Duration,
}

impl CredentialCache {
    pub fn new(storage: SessionStorage, ttl: Duration) -> Self {
        Self { storage, ttl }
    }

    pub fn put(&self, token: &str, identity: &Identity, organization: &Organization) {
        let record = CachedIdentity {
            token_fingerprint: token_fingerprint(token),
            identity: identity.clone(),
            organization: organization.clone(),
        };
        self.storage.set(IDENTITY_CACHE_KEY, &record);
        tracing::debug!(user_id = %identity.id, "identity cache primed");
    }

    /// Hit only when the record decodes completely, belongs to `token` and is younger
    /// than the TTL.
    pub fn try_get(&self, token: &str) -> Option<CachedIdentity> {
        let envelope = self.storage.get::<CachedIdentity>(IDENTITY_CACHE_KEY)?;
        if envelope.payload.token_fingerprint != token_fingerprint(token) {
            tracing::debug!("identity cache belongs to another token");
            return None;
        }

        let age = envelope.age(self.storage.clock().now());

        if age >= self.ttl {
            tracing::debug!(age_secs = age.num_seconds(), "identity cache expired");
            return None;
        }

        Some(envelope.payload)
    }

    pub fn invalidate(&self) {
        self.storage.remove(IDENTITY_CACHE_KEY);
    }
}
