//! Session controller - login, logout, timeout enforcement and identity orchestration
//!
//! The controller is the only writer of session state. Guards and the monitor read it
//! through its query methods and converge on the same idempotent teardown.

mod controller;
mod monitor;

pub use controller::SessionController;
pub use monitor::{MonitorHandle, SessionMonitor};

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const SESSION_KEY: &str = "ferdi_session";
pub const INTENDED_PATH_KEY: &str = "ferdi_intended_path";
pub const CURRENT_PATH_KEY: &str = "ferdi_current_path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Anonymous,
    Checking,
    Authenticated,
    Error,
}

/// Why `check_auth` reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthReason {
    NoToken,
    SessionTimeout,
    Cache,
    FreshData,
    AuthFailed,
    /// A login or logout happened while the fetch was in flight; its result was dropped.
    Superseded,
}

impl AuthReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthReason::NoToken => "no_token",
            AuthReason::SessionTimeout => "session_timeout",
            AuthReason::Cache => "cache",
            AuthReason::FreshData => "fresh_data",
            AuthReason::AuthFailed => "auth_failed",
            AuthReason::Superseded => "superseded",
        }
    }
}

impl fmt::Display for AuthReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthCheck {
    pub authenticated: bool,
    pub reason: AuthReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthCheck {
    pub fn accepted(reason: AuthReason) -> Self {
        Self {
            authenticated: true,
            reason,
            error: None,
        }
    }

    pub fn rejected(reason: AuthReason) -> Self {
        Self {
            authenticated: false,
            reason,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    UserRequested,
    SessionTimeout,
    SessionExpired,
    AuthFailed,
    AuthCheckFailed,
    AuthenticationError,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::UserRequested => "user_requested",
            LogoutReason::SessionTimeout => "session_timeout",
            LogoutReason::SessionExpired => "session_expired",
            LogoutReason::AuthFailed => "auth_failed",
            LogoutReason::AuthCheckFailed => "auth_check_failed",
            LogoutReason::AuthenticationError => "authentication_error",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String },
    LoggedOut { reason: LogoutReason },
    ExpiringSoon { remaining: Duration },
    SessionExtended,
}

/// Token record persisted under [`SESSION_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Local expiry, pushed forward on every activity.
    pub expires_at: DateTime<Utc>,
    /// `exp` of the token itself, when it is a readable JWT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    pub fn start(token: String, now: DateTime<Utc>, timeout: Duration) -> Self {
        let token_expires_at = crate::jwt::token_expiry(&token);
        Self {
            token,
            issued_at: now,
            last_activity: now,
            expires_at: now + timeout,
            token_expires_at,
        }
    }

    /// Records activity. `last_activity` always moves forward, even under a stalled clock.
    pub fn touch(&mut self, now: DateTime<Utc>, timeout: Duration) {
        let floor = self.last_activity + Duration::milliseconds(1);
        self.last_activity = if now > self.last_activity { now } else { floor };
        self.expires_at = self.last_activity + timeout;
    }

    /// The earlier of the idle deadline and the token's own expiry.
    pub fn deadline(&self, timeout: Duration) -> DateTime<Utc> {
        let idle = self.last_activity + timeout;
        match self.token_expires_at {
            Some(exp) if exp < idle => exp,
            _ => idle,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now < self.deadline(timeout)
    }
}

/// Snapshot for session countdowns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub issued_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub remaining: Duration,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_boundary_is_exclusive() {
        let now = Utc::now();
        let timeout = Duration::minutes(10);
        let session = StoredSession::start("opaque".into(), now, timeout);

        assert!(session.is_valid(now + timeout - Duration::milliseconds(1), timeout));
        assert!(!session.is_valid(now + timeout, timeout));
    }

    #[test]
    fn touch_moves_forward_under_stalled_clock() {
        let now = Utc::now();
        let timeout = Duration::minutes(10);
        let mut session = StoredSession::start("opaque".into(), now, timeout);

        session.touch(now, timeout);
        assert!(session.last_activity > now);
        assert_eq!(session.expires_at, session.last_activity + timeout);
    }

    #[test]
    fn reason_strings() {
        assert_eq!(AuthReason::SessionTimeout.to_string(), "session_timeout");
        assert_eq!(AuthReason::FreshData.as_str(), "fresh_data");
        assert_eq!(LogoutReason::AuthCheckFailed.to_string(), "auth_check_failed");
    }
}
