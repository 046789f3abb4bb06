//! Repository for the `invites` table.
//!
//! Every state change is a conditional `UPDATE ... WHERE status = 'pending'`,
//! so terminal states are never left and racing writers see one winner.

use async_trait::async_trait;
use onboard_core::status::InviteStatus;
use onboard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::invite::{CreateInvite, Invite, InviteFilter, RedeemTeamInvite};
use crate::models::user::User;
use crate::repositories::user_repo;
use crate::repository::InviteRepository;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token, email, company_name, invited_by, status, expires_at, \
                       used_at, project_id, metadata, created_at, updated_at";

/// Optional filters as nullable parameters `$1` (status) and `$2` (email substring).
const FILTER: &str = "($1::TEXT IS NULL OR status = $1) \
                      AND ($2::TEXT IS NULL OR email ILIKE '%' || $2 || '%')";

/// Postgres-backed [`InviteRepository`].
pub struct InviteRepo {
    pool: PgPool,
}

impl InviteRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteRepository for InviteRepo {
    async fn create(&self, input: &CreateInvite) -> DbResult<Invite> {
        let query = format!(
            "INSERT INTO invites (token, email, company_name, invited_by, expires_at, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(&input.token)
            .bind(&input.email)
            .bind(&input.company_name)
            .bind(input.invited_by)
            .bind(input.expires_at)
            .bind(&input.metadata)
            .fetch_one(&self.pool)
            .await?;
        Ok(invite)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Invite>> {
        let query = format!("SELECT {COLUMNS} FROM invites WHERE id = $1");
        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invite)
    }

    async fn find_by_token(&self, token: &str) -> DbResult<Option<Invite>> {
        let query = format!("SELECT {COLUMNS} FROM invites WHERE token = $1");
        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invite)
    }

    async fn list(&self, filter: &InviteFilter) -> DbResult<Vec<Invite>> {
        let query = format!(
            "SELECT {COLUMNS} FROM invites WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let invites = sqlx::query_as::<_, Invite>(&query)
            .bind(filter.status.map(InviteStatus::as_str))
            .bind(&filter.email)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(invites)
    }

    async fn count(&self, filter: &InviteFilter) -> DbResult<i64> {
        let query = format!("SELECT COUNT(*) FROM invites WHERE {FILTER}");
        let count: i64 = sqlx::query_scalar(&query)
            .bind(filter.status.map(InviteStatus::as_str))
            .bind(&filter.email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn mark_used(&self, token: &str, project_id: Option<DbId>) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'used', used_at = NOW(), project_id = COALESCE($2, project_id)
             WHERE token = $1 AND status = 'pending'",
        )
        .bind(token)
        .bind(project_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, id: DbId) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE invites SET status = 'revoked' WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire(&self, id: DbId) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE invites SET status = 'expired' WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_stale(&self, now: Timestamp) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'expired' WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn redeem_team_invite(&self, input: &RedeemTeamInvite) -> DbResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let used = sqlx::query(
            "UPDATE invites SET status = 'used', used_at = NOW()
             WHERE token = $1 AND status = 'pending' AND expires_at > NOW()",
        )
        .bind(&input.token)
        .execute(&mut *tx)
        .await?;
        if used.rows_affected() == 0 {
            return Ok(None);
        }

        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1) FOR UPDATE",
            user_repo::COLUMNS
        );
        let existing = sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .fetch_optional(&mut *tx)
            .await?;
        let user = match existing {
            Some(user) => {
                let query = format!(
                    "UPDATE users SET password_hash = $2 WHERE id = $1 RETURNING {}",
                    user_repo::COLUMNS
                );
                sqlx::query_as::<_, User>(&query)
                    .bind(user.id)
                    .bind(&input.password_hash)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => {
                let query = format!(
                    "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {}",
                    user_repo::COLUMNS
                );
                sqlx::query_as::<_, User>(&query)
                    .bind(&input.email)
                    .bind(&input.password_hash)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        sqlx::query("INSERT INTO portal_users (user_id, company_id, contact_id) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(input.company_id)
            .bind(input.contact_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user))
    }
}
