use std::sync::Arc;

use super::{LOGIN_PATH, PUBLIC_EXACT, PUBLIC_PREFIXES};
use crate::session::{AuthCheck, AuthReason, MonitorHandle, SessionController, SessionMonitor};

pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Public,
    Authenticated,
    Unauthenticated,
    Error,
}

/// User-facing message accompanying an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    SessionExpired,
    AuthFailed(String),
    ConnectionRestored,
    TooManyRetries,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::SessionExpired => "Your session has expired, please sign in again".to_string(),
            Notice::AuthFailed(detail) => format!("Authentication error: {detail}"),
            Notice::ConnectionRestored => "Connection restored".to_string(),
            Notice::TooManyRetries => {
                "Too many attempts, reload the page or contact support".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Render { notice: Option<Notice> },
    Redirect { to: String, notice: Option<Notice> },
    Failed { message: String, retries_left: u32 },
    RetriesExhausted,
}

/// Authentication gate in front of every protected route.
pub struct AuthGate {
    controller: Arc<SessionController>,
    state: GateState,
    retry_count: u32,
    public_prefixes: Vec<String>,
    public_exact: Vec<String>,
    monitor: Option<MonitorHandle>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("state", &self.state)
            .field("retry_count", &self.retry_count)
            .field("monitoring", &self.monitor.is_some())
            .finish()
    }
}

impl AuthGate {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self {
            controller,
            state: GateState::Checking,
            retry_count: 0,
            public_prefixes: PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
            public_exact: PUBLIC_EXACT.iter().map(|p| p.to_string()).collect(),
            monitor: None,
        }
    }

    pub fn with_public_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the session monitor for as long as this gate lives.
    pub fn with_monitor(mut self) -> Self {
        let monitor = SessionMonitor::from_controller(&self.controller);
        self.monitor = Some(monitor.spawn(self.controller.clone()));
        self
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_exact.iter().any(|exact| exact == path)
            || self.public_prefixes.iter().any(|prefix| {
                path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path[prefix.len()..].starts_with(['/', '?']))
            })
    }

    pub async fn navigate(&mut self, path: &str) -> GateOutcome {
        if self.is_public(path) {
            tracing::debug!(path = %path, "public route, skipping auth check");
            self.state = GateState::Public;
            return GateOutcome::Render { notice: None };
        }

        self.controller.save_current_path(path);
        self.state = GateState::Checking;
        self.controller.clear_error();

        match self.controller.check_auth(false).await {
            Ok(check) if check.authenticated => self.admit(path, None),
            Ok(check) => self.reject(path, &check),
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "auth check errored");
                self.state = GateState::Error;
                GateOutcome::Failed {
                    message: err.user_message(),
                    retries_left: MAX_RETRIES.saturating_sub(self.retry_count),
                }
            }
        }
    }

    /// Forces a fresh, cache-skipping check. Capped at [`MAX_RETRIES`] attempts.
    pub async fn retry(&mut self, path: &str) -> GateOutcome {
        if self.retry_count >= MAX_RETRIES {
            return GateOutcome::RetriesExhausted;
        }
        self.retry_count += 1;

        match self.controller.check_auth(true).await {
            Ok(check) if check.authenticated => {
                tracing::info!(attempt = self.retry_count, "auth re-check succeeded");
                self.admit(path, Some(Notice::ConnectionRestored))
            }
            Ok(check) => self.reject(path, &check),
            Err(err) => {
                tracing::warn!(attempt = self.retry_count, error = %err, "auth re-check failed");
                self.state = GateState::Error;
                if self.retry_count >= MAX_RETRIES {
                    GateOutcome::RetriesExhausted
                } else {
                    GateOutcome::Failed {
                        message: err.user_message(),
                        retries_left: MAX_RETRIES - self.retry_count,
                    }
                }
            }
        }
    }

    /// Authenticated branch: honors a pending intended path once, otherwise renders.
    fn admit(&mut self, path: &str, notice: Option<Notice>) -> GateOutcome {
        self.state = GateState::Authenticated;
        self.retry_count = 0;

        match self.controller.take_intended_path() {
            Some(intended) if intended != path => {
                tracing::debug!(from = %path, to = %intended, "redirecting to intended path");
                GateOutcome::Redirect { to: intended, notice }
            }
            _ => GateOutcome::Render { notice },
        }
    }

    fn reject(&mut self, path: &str, check: &AuthCheck) -> GateOutcome {
        tracing::debug!(path = %path, reason = %check.reason, "auth check rejected");
        if path != LOGIN_PATH {
            self.controller.save_intended_path(path);
        }
        self.state = GateState::Unauthenticated;

        let notice = match check.reason {
            AuthReason::SessionTimeout => Some(Notice::SessionExpired),
            AuthReason::AuthFailed => Some(Notice::AuthFailed(
                check
                    .error
                    .clone()
                    .unwrap_or_else(|| "please sign in again".to_string()),
            )),
            _ => None,
        };

        GateOutcome::Redirect {
            to: LOGIN_PATH.to_string(),
            notice,
        }
    }
}
