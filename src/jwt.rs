use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::errors::AppError;

/// Claims the client cares about. The backend signs the token; the client cannot verify it
/// and only reads these to anticipate expiry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Reads the claims of a JWT without checking its signature.
pub fn peek_claims(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|err| AppError::token(err.to_string()))
}

/// Server-side expiry of the token, when it is a JWT carrying `exp`. Opaque tokens yield `None`.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    peek_claims(token).ok().and_then(|claims| claims.expires_at())
}
