//! Staff and portal-user records that give a user its access scope.

use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `staff_members`: unrestricted access across tenants.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffMember {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub role: String,
    pub created_at: Timestamp,
}

/// A row from `portal_users`: access scoped to one company.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PortalUser {
    pub id: DbId,
    pub user_id: DbId,
    pub company_id: DbId,
    pub contact_id: DbId,
    pub created_at: Timestamp,
}
