//! Repository for `integration_configs`.

use async_trait::async_trait;
use onboard_core::status::IntegrationStatus;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::integration::{IntegrationConfig, UpsertIntegration};
use crate::repository::IntegrationRepository;

const COLUMNS: &str = "id, project_id, system_type, settings, status, created_at, updated_at";

/// Postgres-backed [`IntegrationRepository`].
pub struct IntegrationRepo {
    pool: PgPool,
}

impl IntegrationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationRepository for IntegrationRepo {
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<IntegrationConfig>> {
        let query = format!(
            "SELECT {COLUMNS} FROM integration_configs WHERE project_id = $1 ORDER BY system_type"
        );
        let configs = sqlx::query_as::<_, IntegrationConfig>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(configs)
    }

    async fn upsert(
        &self,
        project_id: DbId,
        input: &UpsertIntegration,
    ) -> DbResult<IntegrationConfig> {
        let query = format!(
            "INSERT INTO integration_configs (project_id, system_type, settings, status)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project_id, system_type)
             DO UPDATE SET settings = EXCLUDED.settings, status = EXCLUDED.status
             RETURNING {COLUMNS}"
        );
        let status = input.status.unwrap_or(IntegrationStatus::Pending);
        let config = sqlx::query_as::<_, IntegrationConfig>(&query)
            .bind(project_id)
            .bind(&input.system_type)
            .bind(&input.settings)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(config)
    }
}
