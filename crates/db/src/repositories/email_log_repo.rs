//! Repository for the append-only `email_logs` table.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::email_log::{CreateEmailLog, EmailLog};
use crate::repository::EmailLogRepository;

const COLUMNS: &str = "id, email_type, recipient, subject, success, message_id, error, \
                       project_id, invite_id, created_at";

/// Postgres-backed [`EmailLogRepository`].
pub struct EmailLogRepo {
    pool: PgPool,
}

impl EmailLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailLogRepository for EmailLogRepo {
    async fn create(&self, input: &CreateEmailLog) -> DbResult<EmailLog> {
        let query = format!(
            "INSERT INTO email_logs
                (email_type, recipient, subject, success, message_id, error, project_id, invite_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let log = sqlx::query_as::<_, EmailLog>(&query)
            .bind(input.email_type.as_str())
            .bind(&input.recipient)
            .bind(&input.subject)
            .bind(input.success)
            .bind(&input.message_id)
            .bind(&input.error)
            .bind(input.project_id)
            .bind(input.invite_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(log)
    }

    async fn list(
        &self,
        project_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<EmailLog>> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_logs
             WHERE ($1::BIGINT IS NULL OR project_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        let logs = sqlx::query_as::<_, EmailLog>(&query)
            .bind(project_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }
}
