use super::permissions as p;
use super::principal::{Role, RoleId};

/// What a role is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Satisfies every permission check, including unregistered names.
    All,
    Only(&'static [&'static str]),
}

impl Grant {
    pub fn allows(&self, permission: &str) -> bool {
        match self {
            Grant::All => true,
            Grant::Only(list) => list.iter().any(|granted| *granted == permission),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefinition {
    pub role: Role,
    pub label: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    /// Lower is more privileged.
    pub priority: u8,
    pub grant: Grant,
}

pub static CATALOG: [RoleDefinition; 6] = [
    RoleDefinition {
        role: Role::SuperAdmin,
        label: "Ferdi Admin",
        description: "System administrator with access to every company",
        color: "red",
        priority: 1,
        grant: Grant::All,
    },
    RoleDefinition {
        role: Role::Admin,
        label: "Administrator",
        description: "Company administrator with full management rights",
        color: "purple",
        priority: 2,
        grant: Grant::Only(&[
            p::COMPANY_MANAGE,
            p::USERS_MANAGE,
            p::FLEET_MANAGE,
            p::ROUTES_MANAGE,
            p::DRIVERS_MANAGE,
            p::SCHEDULE_MANAGE,
            p::BILLING_MANAGE,
            p::QUOTES_MANAGE,
            p::REPORTS_ACCESS,
            p::COMPANY_SETTINGS,
            p::INVITATIONS_MANAGE,
        ]),
    },
    RoleDefinition {
        role: Role::Dispatcher,
        label: "Dispatcher",
        description: "Operations manager for planning and assignments",
        color: "blue",
        priority: 3,
        grant: Grant::Only(&[
            p::ROUTES_MANAGE,
            p::SCHEDULE_MANAGE,
            p::DRIVERS_ASSIGN,
            p::FLEET_VIEW,
            p::DRIVERS_VIEW,
            p::CIRCULATION_DATA,
            p::ROUTE_OPTIMIZATION,
            p::PLANNING_FULL,
        ]),
    },
    RoleDefinition {
        role: Role::Driver,
        label: "Driver",
        description: "Driver with access limited to assigned missions",
        color: "green",
        priority: 4,
        grant: Grant::Only(&[
            p::ROUTES_VIEW_ASSIGNED,
            p::SCHEDULE_VIEW_ASSIGNED,
            p::VEHICLE_CHECK,
            p::TRIP_STATUS_UPDATE,
            p::PROFILE_MANAGE,
        ]),
    },
    RoleDefinition {
        role: Role::InternalSupport,
        label: "Internal Support",
        description: "Customer support with read access for assistance",
        color: "orange",
        priority: 5,
        grant: Grant::Only(&[
            p::SUPPORT_ACCESS,
            p::USERS_VIEW,
            p::ROUTES_VIEW,
            p::FLEET_VIEW,
            p::DRIVERS_VIEW,
            p::CLIENT_ASSISTANCE,
            p::BASIC_REPORTS,
        ]),
    },
    RoleDefinition {
        role: Role::Accountant,
        label: "Accountant",
        description: "Accounting, billing and financial reports",
        color: "teal",
        priority: 6,
        grant: Grant::Only(&[
            p::BILLING_MANAGE,
            p::INVOICES_MANAGE,
            p::QUOTES_VIEW,
            p::REPORTS_ACCESS,
            p::FINANCIAL_REPORTS,
            p::EXPORTS_ACCESS,
            p::PAYMENT_TRACKING,
        ]),
    },
];

/// Catalog entry for a raw role id. Unknown ids have no entry.
pub fn lookup(role: &RoleId) -> Option<&'static RoleDefinition> {
    role.known().map(definition)
}

pub fn definition(role: Role) -> &'static RoleDefinition {
    // CATALOG is declared in the same order as Role::ALL.
    match role {
        Role::SuperAdmin => &CATALOG[0],
        Role::Admin => &CATALOG[1],
        Role::Dispatcher => &CATALOG[2],
        Role::Driver => &CATALOG[3],
        Role::InternalSupport => &CATALOG[4],
        Role::Accountant => &CATALOG[5],
    }
}
