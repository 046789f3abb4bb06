//! Repository for `staff_members` and `portal_users`.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::principal::{PortalUser, StaffMember};
use crate::repository::PrincipalRepository;

const STAFF_COLUMNS: &str = "id, user_id, name, role, created_at";
pub(crate) const PORTAL_COLUMNS: &str = "id, user_id, company_id, contact_id, created_at";

/// Postgres-backed [`PrincipalRepository`].
pub struct PrincipalRepo {
    pool: PgPool,
}

impl PrincipalRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalRepository for PrincipalRepo {
    async fn find_staff(&self, user_id: DbId) -> DbResult<Option<StaffMember>> {
        let query = format!("SELECT {STAFF_COLUMNS} FROM staff_members WHERE user_id = $1");
        let staff = sqlx::query_as::<_, StaffMember>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn find_portal_user(&self, user_id: DbId) -> DbResult<Option<PortalUser>> {
        let query = format!("SELECT {PORTAL_COLUMNS} FROM portal_users WHERE user_id = $1");
        let portal_user = sqlx::query_as::<_, PortalUser>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(portal_user)
    }

    async fn create_staff(&self, user_id: DbId, name: &str, role: &str) -> DbResult<StaffMember> {
        let query = format!(
            "INSERT INTO staff_members (user_id, name, role) VALUES ($1, $2, $3)
             RETURNING {STAFF_COLUMNS}"
        );
        let staff = sqlx::query_as::<_, StaffMember>(&query)
            .bind(user_id)
            .bind(name)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(staff)
    }

    async fn create_portal_user(
        &self,
        user_id: DbId,
        company_id: DbId,
        contact_id: DbId,
    ) -> DbResult<PortalUser> {
        let query = format!(
            "INSERT INTO portal_users (user_id, company_id, contact_id) VALUES ($1, $2, $3)
             RETURNING {PORTAL_COLUMNS}"
        );
        let portal_user = sqlx::query_as::<_, PortalUser>(&query)
            .bind(user_id)
            .bind(company_id)
            .bind(contact_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(portal_user)
    }
}
