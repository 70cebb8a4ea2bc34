use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Stable short identifier for a bearer token, safe to put in logs.
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..12].to_string()
}

/// Renders a duration as `m:ss`, clamping negatives to zero.
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!("{}:{:02}", total / 60, total % 60)
}
