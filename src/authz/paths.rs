use super::principal::{Role, RoleId};

pub const DEFAULT_DASHBOARD: &str = "/dashboard";

const BASE_PATHS: &[&str] = &["/dashboard", "/dashboard/profile"];

pub fn dashboard_path(role: &RoleId) -> &'static str {
    match role.known() {
        Some(Role::SuperAdmin) => "/dashboard/admin",
        Some(Role::Admin) => "/dashboard/company-admin",
        Some(Role::Dispatcher) => "/dashboard/dispatcher",
        Some(Role::Driver) => "/dashboard/driver",
        Some(Role::InternalSupport) => "/dashboard/support",
        Some(Role::Accountant) => "/dashboard/accountant",
        None => DEFAULT_DASHBOARD,
    }
}

pub fn is_role_dashboard(path: &str) -> bool {
    Role::ALL
        .iter()
        .any(|role| dashboard_path(&RoleId::from(*role)) == path)
}

/// Paths a role may open. `None` means unrestricted.
pub fn allowed_paths(role: &RoleId) -> Option<Vec<&'static str>> {
    let extra: &[&str] = match role.known() {
        Some(Role::SuperAdmin) => return None,
        Some(Role::Admin) => &[
            "/dashboard/admin",
            "/dashboard/company-admin",
            "/dashboard/company",
            "/dashboard/users",
            "/dashboard/fleet",
            "/dashboard/routes",
            "/dashboard/schedule",
            "/dashboard/drivers",
            "/dashboard/quotes",
            "/dashboard/invoices",
            "/dashboard/reports",
            "/dashboard/automatisations",
            "/dashboard/subcontractors",
            "/dashboard/legal-documents",
            "/dashboard/planning",
            "/dashboard/clients",
            "/dashboard/settings",
            "/dashboard/support",
        ],
        Some(Role::Dispatcher) => &[
            "/dashboard/dispatcher",
            "/dashboard/routes",
            "/dashboard/schedule",
            "/dashboard/planning",
            "/dashboard/fleet-view",
            "/dashboard/drivers-view",
            "/dashboard/subcontractors",
            "/dashboard/support",
        ],
        Some(Role::Driver) => &[
            "/dashboard/driver",
            "/dashboard/my-routes",
            "/dashboard/my-schedule",
            "/dashboard/planning",
            "/dashboard/support",
        ],
        Some(Role::InternalSupport) => &[
            "/dashboard/support",
            "/dashboard/clients",
            "/dashboard/fleet-view",
            "/dashboard/drivers-view",
            "/dashboard/routes",
            "/dashboard/users",
        ],
        Some(Role::Accountant) => &[
            "/dashboard/accountant",
            "/dashboard/quotes-view",
            "/dashboard/invoices",
            "/dashboard/reports",
            "/dashboard/legal-documents",
            "/dashboard/support",
        ],
        None => &[],
    };

    Some(BASE_PATHS.iter().chain(extra.iter()).copied().collect())
}

/// A path is reachable when it equals an allowed path or sits below one.
/// `/dashboard` itself only matches exactly, otherwise every dashboard page would open.
pub fn can_access_path(role: &RoleId, path: &str) -> bool {
    let Some(allowed) = allowed_paths(role) else {
        return true;
    };
    let path = path.trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    allowed.iter().any(|allowed| {
        path == *allowed
            || (*allowed != DEFAULT_DASHBOARD
                && path.starts_with(allowed)
                && path[allowed.len()..].starts_with('/'))
    })
}
