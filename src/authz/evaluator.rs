use super::catalog::{lookup, Grant};
use super::principal::RoleId;

/// Fallback priority for roles outside the catalog; ranks below every known role.
const UNKNOWN_PRIORITY: u8 = u8::MAX;

/// Check whether a role satisfies a single permission.
///
/// Evaluation order:
/// 1. unknown role -> deny
/// 2. all-permissions grant -> allow
/// 3. permission listed in the role's grant -> allow
/// 4. deny
pub fn role_satisfies(role: &RoleId, permission: &str) -> bool {
    let Some(definition) = lookup(role) else {
        tracing::debug!(role = %role, permission = %permission, "unknown role, permission denied");
        return false;
    };

    match definition.grant {
        Grant::All => {
            tracing::debug!(role = %role, permission = %permission, "all-permissions grant");
            true
        }
        grant => {
            let allowed = grant.allows(permission);
            if !allowed {
                tracing::debug!(role = %role, permission = %permission, "permission denied");
            }
            allowed
        }
    }
}

/// Page-level authorization.
///
/// Role membership is OR'd across `allowed_roles`, permission satisfaction is OR'd across
/// `required_permissions`, and the two groups are AND'd. An empty group does not restrict.
pub fn authorize<R, P>(role: &RoleId, allowed_roles: &[R], required_permissions: &[P]) -> bool
where
    R: AsRef<str>,
    P: AsRef<str>,
{
    let role_ok = allowed_roles.is_empty()
        || allowed_roles
            .iter()
            .any(|allowed| role.same_role(&RoleId::new(allowed.as_ref())));

    let permission_ok = required_permissions.is_empty()
        || required_permissions
            .iter()
            .any(|permission| role_satisfies(role, permission.as_ref()));

    role_ok && permission_ok
}

pub fn role_priority(role: &RoleId) -> u8 {
    lookup(role).map(|def| def.priority).unwrap_or(UNKNOWN_PRIORITY)
}

/// True when `role` ranks at least as high as `required`. Unknown roles never qualify.
pub fn is_role_higher_or_equal(role: &RoleId, required: &RoleId) -> bool {
    match (lookup(role), lookup(required)) {
        (Some(have), Some(need)) => have.priority <= need.priority,
        _ => false,
    }
}
