//! Route guards - decide render, redirect or refuse for a navigation
//!
//! Both gates only read controller state; neither touches the backend or storage directly.

mod auth_gate;
mod role_gate;

pub use auth_gate::{AuthGate, GateOutcome, GateState, Notice, MAX_RETRIES};
pub use role_gate::{GuardAction, RoleGate, RoleOutcome, UnauthorizedView};

pub const LOGIN_PATH: &str = "/auth/login";

/// Route prefixes reachable without a session.
pub const PUBLIC_PREFIXES: &[&str] = &["/auth/login", "/auth/register", "/auth/forgot-password", "/demo"];

/// Routes public only on an exact match; `/` as a prefix would expose everything.
pub const PUBLIC_EXACT: &[&str] = &["/"];
