//! Repository for magic-link `login_codes`.

use async_trait::async_trait;
use onboard_core::types::Timestamp;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::login_code::LoginCode;
use crate::repository::LoginCodeRepository;

const COLUMNS: &str = "id, email, code_hash, expires_at, attempts, consumed_at, created_at";

/// Postgres-backed [`LoginCodeRepository`].
pub struct LoginCodeRepo {
    pool: PgPool,
}

impl LoginCodeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginCodeRepository for LoginCodeRepo {
    async fn replace_for_email(
        &self,
        email: &str,
        code_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<LoginCode> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM login_codes WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .execute(&mut *tx)
            .await?;
        let query = format!(
            "INSERT INTO login_codes (email, code_hash, expires_at) VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let code = sqlx::query_as::<_, LoginCode>(&query)
            .bind(email)
            .bind(code_hash)
            .bind(expires_at)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(code)
    }

    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        max_attempts: i32,
    ) -> DbResult<Option<LoginCode>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent guesses against the same code.
        let query = format!(
            "SELECT {COLUMNS} FROM login_codes
             WHERE LOWER(email) = LOWER($1)
               AND consumed_at IS NULL AND expires_at > NOW()
             ORDER BY created_at DESC, id DESC
             LIMIT 1
             FOR UPDATE"
        );
        let Some(live) = sqlx::query_as::<_, LoginCode>(&query)
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.commit().await?;
            return Ok(None);
        };

        let consumed = if live.code_hash == code_hash {
            let query = format!(
                "UPDATE login_codes SET consumed_at = NOW() WHERE id = $1 RETURNING {COLUMNS}"
            );
            let code = sqlx::query_as::<_, LoginCode>(&query)
                .bind(live.id)
                .fetch_one(&mut *tx)
                .await?;
            Some(code)
        } else {
            sqlx::query(
                "UPDATE login_codes
                 SET attempts = attempts + 1,
                     consumed_at = CASE WHEN attempts + 1 >= $2 THEN NOW() ELSE NULL END
                 WHERE id = $1",
            )
            .bind(live.id)
            .bind(max_attempts)
            .execute(&mut *tx)
            .await?;
            None
        };

        tx.commit().await?;
        Ok(consumed)
    }
}
