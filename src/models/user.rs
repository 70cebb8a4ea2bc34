use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::RoleId;

/// The authenticated principal as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub role: RoleId,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Identity {
    pub fn display_name(&self) -> String {
        if let Some(full) = self.full_name.as_deref().filter(|name| !name.trim().is_empty()) {
            return full.to_string();
        }
        let joined = format!("{} {}", self.first_name, self.last_name);
        let joined = joined.trim();
        if joined.is_empty() {
            self.email.clone()
        } else {
            joined.to_string()
        }
    }
}

/// Response of `POST /login/access-token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of `POST /users/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    /// Join code of the company the user asks to join.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,
}
