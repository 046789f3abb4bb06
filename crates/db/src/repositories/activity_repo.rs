//! Repository for the append-only `activity_logs` table.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::activity::{ActivityLog, CreateActivity};
use crate::repository::ActivityRepository;

pub(crate) const COLUMNS: &str = "id, project_id, actor_id, action, details, created_at";

/// Postgres-backed [`ActivityRepository`]. Rows are never updated or deleted.
pub struct ActivityRepo {
    pool: PgPool,
}

impl ActivityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for ActivityRepo {
    async fn create(&self, input: &CreateActivity) -> DbResult<ActivityLog> {
        let query = format!(
            "INSERT INTO activity_logs (project_id, actor_id, action, details)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, ActivityLog>(&query)
            .bind(input.project_id)
            .bind(input.actor_id)
            .bind(&input.action)
            .bind(&input.details)
            .fetch_one(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_for_project(
        &self,
        project_id: DbId,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<ActivityLog>> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs
             WHERE project_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        let entries = sqlx::query_as::<_, ActivityLog>(&query)
            .bind(project_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
