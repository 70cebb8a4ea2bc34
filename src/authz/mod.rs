//! Authorization module - Permission Catalog and role predicates
//!
//! This module implements the static role catalog with support for:
//! - A closed set of six roles keyed by their wire ids ("1".."6")
//! - An explicit all-permissions grant for the super admin
//! - Role priorities and per-role dashboard/path tables
//! - Fail-closed evaluation for unknown roles

mod catalog;
mod evaluator;
mod paths;
mod principal;

pub use catalog::{definition, lookup, Grant, RoleDefinition, CATALOG};
pub use evaluator::{authorize, is_role_higher_or_equal, role_priority, role_satisfies};
pub use paths::{allowed_paths, can_access_path, dashboard_path, is_role_dashboard, DEFAULT_DASHBOARD};
pub use principal::{Principal, Role, RoleId};

/// Well-known permission names
pub mod permissions {
    // Platform
    pub const MULTI_COMPANY_ACCESS: &str = "multi_company_access";
    pub const SYSTEM_ADMIN: &str = "system_admin";
    pub const SUPPORT_ALL_CLIENTS: &str = "support_all_clients";
    pub const VIEW_ALL_COMPANIES: &str = "view_all_companies";
    pub const MANAGE_ALL_USERS: &str = "manage_all_users";
    pub const SYSTEM_SETTINGS: &str = "system_settings";
    pub const AUDIT_LOGS: &str = "audit_logs";

    // Company
    pub const COMPANY_MANAGE: &str = "company_manage";
    pub const COMPANY_SETTINGS: &str = "company_settings";
    pub const USERS_MANAGE: &str = "users_manage";
    pub const USERS_VIEW: &str = "users_view";
    pub const INVITATIONS_MANAGE: &str = "invitations_manage";

    // Fleet and drivers
    pub const FLEET_MANAGE: &str = "fleet_manage";
    pub const FLEET_VIEW: &str = "fleet_view";
    pub const DRIVERS_MANAGE: &str = "drivers_manage";
    pub const DRIVERS_VIEW: &str = "drivers_view";
    pub const DRIVERS_ASSIGN: &str = "drivers_assign";
    pub const VEHICLE_CHECK: &str = "vehicle_check";

    // Routes and planning
    pub const ROUTES_MANAGE: &str = "routes_manage";
    pub const ROUTES_VIEW: &str = "routes_view";
    pub const ROUTES_VIEW_ASSIGNED: &str = "routes_view_assigned";
    pub const SCHEDULE_MANAGE: &str = "schedule_manage";
    pub const SCHEDULE_VIEW_ASSIGNED: &str = "schedule_view_assigned";
    pub const PLANNING_FULL: &str = "planning_full";
    pub const CIRCULATION_DATA: &str = "circulation_data";
    pub const ROUTE_OPTIMIZATION: &str = "route_optimization";
    pub const TRIP_STATUS_UPDATE: &str = "trip_status_update";

    // Finance
    pub const BILLING_MANAGE: &str = "billing_manage";
    pub const INVOICES_MANAGE: &str = "invoices_manage";
    pub const QUOTES_MANAGE: &str = "quotes_manage";
    pub const QUOTES_VIEW: &str = "quotes_view";
    pub const REPORTS_ACCESS: &str = "reports_access";
    pub const FINANCIAL_REPORTS: &str = "financial_reports";
    pub const EXPORTS_ACCESS: &str = "exports_access";
    pub const PAYMENT_TRACKING: &str = "payment_tracking";
    pub const BASIC_REPORTS: &str = "basic_reports";

    // Support and self-service
    pub const SUPPORT_ACCESS: &str = "support_access";
    pub const CLIENT_ASSISTANCE: &str = "client_assistance";
    pub const PROFILE_MANAGE: &str = "profile_manage";
}
