use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of roles the catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    SuperAdmin,
    Admin,
    Dispatcher,
    Driver,
    InternalSupport,
    Accountant,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Dispatcher,
        Role::Driver,
        Role::InternalSupport,
        Role::Accountant,
    ];

    /// Wire identifier used by the backend.
    pub fn id(self) -> &'static str {
        match self {
            Role::SuperAdmin => "1",
            Role::Admin => "2",
            Role::Dispatcher => "3",
            Role::Driver => "4",
            Role::InternalSupport => "5",
            Role::Accountant => "6",
        }
    }

    /// Accepts both the numeric wire ids and the uppercase enum names.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim() {
            "1" | "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "2" | "ADMIN" => Some(Role::Admin),
            "3" | "DISPATCH" => Some(Role::Dispatcher),
            "4" | "DRIVER" => Some(Role::Driver),
            "5" | "INTERNAL_SUPPORT" => Some(Role::InternalSupport),
            "6" | "ACCOUNTANT" => Some(Role::Accountant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Role identifier exactly as received. May name a role the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn known(&self) -> Option<Role> {
        Role::parse(&self.0)
    }

    /// Two ids name the same role when they resolve to the same catalog entry.
    /// Unknown ids never match anything.
    pub fn same_role(&self, other: &RoleId) -> bool {
        match (self.known(), other.known()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Role> for RoleId {
    fn from(role: Role) -> Self {
        Self(role.id().to_string())
    }
}

impl From<&str> for RoleId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for RoleId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Principal represents the authenticated identity as seen by the permission checks.
/// Its grants derive from the role alone.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub role: RoleId,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: impl Into<RoleId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
        }
    }

    pub fn has_role(&self, role: &RoleId) -> bool {
        self.role.same_role(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        super::role_satisfies(&self.role, permission)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.known() == Some(Role::SuperAdmin)
    }
}
