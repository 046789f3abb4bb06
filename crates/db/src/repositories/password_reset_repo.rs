//! Repository for `password_reset_tokens`.

use async_trait::async_trait;
use onboard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::password_reset::PasswordResetToken;
use crate::repository::PasswordResetRepository;

const COLUMNS: &str = "id, user_id, token_hash, expires_at, used_at, created_at";

/// Postgres-backed [`PasswordResetRepository`].
pub struct PasswordResetRepo {
    pool: PgPool,
}

impl PasswordResetRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetRepository for PasswordResetRepo {
    async fn replace_for_user(
        &self,
        user_id: DbId,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<PasswordResetToken> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let query = format!(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(token)
    }

    async fn find_valid(&self, token_hash: &str) -> DbResult<Option<PasswordResetToken>> {
        let query = format!(
            "SELECT {COLUMNS} FROM password_reset_tokens
             WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()"
        );
        let token = sqlx::query_as::<_, PasswordResetToken>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    async fn mark_used(&self, id: DbId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
