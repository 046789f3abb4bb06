//! Well-known staff role names.
//!
//! These must match the `CHECK` constraint on `staff_members.role`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Every role a staff member may hold.
pub const STAFF_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_STAFF];

/// Check whether `role` is a recognised staff role.
pub fn is_staff_role(role: &str) -> bool {
    STAFF_ROLES.contains(&role)
}
