use std::fmt;

use super::LOGIN_PATH;
use crate::authz::{self, RoleId, DEFAULT_DASHBOARD};
use crate::errors::AppResult;
use crate::session::SessionController;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    Back,
    Navigate(String),
}

/// What the refusal page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedView {
    pub role_label: Option<&'static str>,
    pub role_description: Option<&'static str>,
    pub required_roles: Vec<RoleId>,
    pub required_permissions: Vec<String>,
    pub actions: Vec<GuardAction>,
}

impl fmt::Display for UnauthorizedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Access denied: you lack the permissions required for this page.")?;
        if let Some(label) = self.role_label {
            write!(f, "Current role: {label}")?;
            if let Some(description) = self.role_description {
                write!(f, " ({description})")?;
            }
            writeln!(f)?;
        }
        if !self.required_roles.is_empty() {
            let roles: Vec<String> = self
                .required_roles
                .iter()
                .map(|role| match authz::lookup(role) {
                    Some(def) => format!("{} ({})", def.label, role),
                    None => role.to_string(),
                })
                .collect();
            writeln!(f, "Allowed roles: {}", roles.join(", "))?;
        }
        if !self.required_permissions.is_empty() {
            writeln!(f, "Required permissions: {}", self.required_permissions.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    Authorized,
    Unauthorized(UnauthorizedView),
    Redirect(String),
}

/// Page-level role and permission requirements.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed_roles: Vec<RoleId>,
    required_permissions: Vec<String>,
    fallback_path: String,
    show_unauthorized: bool,
}

impl Default for RoleGate {
    fn default() -> Self {
        Self {
            allowed_roles: Vec::new(),
            required_permissions: Vec::new(),
            fallback_path: DEFAULT_DASHBOARD.to_string(),
            show_unauthorized: true,
        }
    }
}

impl RoleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleId>,
    {
        self.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn fallback(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = path.into();
        self
    }

    pub fn show_unauthorized(mut self, show: bool) -> Self {
        self.show_unauthorized = show;
        self
    }

    /// Pure decision for a known role.
    pub fn permits(&self, role: &RoleId) -> bool {
        let roles: Vec<&str> = self.allowed_roles.iter().map(RoleId::as_str).collect();
        authz::authorize(role, &roles, &self.required_permissions)
    }

    pub async fn check(&self, controller: &SessionController) -> AppResult<RoleOutcome> {
        if controller.token().is_none() {
            return Ok(RoleOutcome::Redirect(LOGIN_PATH.to_string()));
        }

        if controller.identity().is_none() {
            let check = controller.check_auth(false).await?;
            if !check.authenticated {
                return Ok(RoleOutcome::Redirect(LOGIN_PATH.to_string()));
            }
        }

        let Some(principal) = controller.principal() else {
            return Ok(RoleOutcome::Redirect(LOGIN_PATH.to_string()));
        };

        if self.permits(&principal.role) {
            return Ok(RoleOutcome::Authorized);
        }

        tracing::info!(
            user_id = %principal.user_id,
            role = %principal.role,
            "role gate refused access"
        );

        if !self.show_unauthorized {
            return Ok(RoleOutcome::Redirect(self.fallback_path.clone()));
        }

        let role_data = authz::lookup(&principal.role);
        Ok(RoleOutcome::Unauthorized(UnauthorizedView {
            role_label: role_data.map(|def| def.label),
            role_description: role_data.map(|def| def.description),
            required_roles: self.allowed_roles.clone(),
            required_permissions: self.required_permissions.clone(),
            actions: vec![
                GuardAction::Back,
                GuardAction::Navigate(self.fallback_path.clone()),
            ],
        }))
    }
}
