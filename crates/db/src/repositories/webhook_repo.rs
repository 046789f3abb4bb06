//! Repository for the `webhooks` table.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::webhook::{CreateWebhook, Webhook};
use crate::repository::WebhookRepository;

const COLUMNS: &str = "id, project_id, url, events, secret, is_active, created_by, created_at";

/// Postgres-backed [`WebhookRepository`].
pub struct WebhookRepo {
    pool: PgPool,
}

impl WebhookRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookRepository for WebhookRepo {
    async fn create(&self, input: &CreateWebhook) -> DbResult<Webhook> {
        let query = format!(
            "INSERT INTO webhooks (project_id, url, events, secret, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let webhook = sqlx::query_as::<_, Webhook>(&query)
            .bind(input.project_id)
            .bind(&input.url)
            .bind(&input.events)
            .bind(&input.secret)
            .bind(input.created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(webhook)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Webhook>> {
        let query = format!("SELECT {COLUMNS} FROM webhooks WHERE id = $1");
        let webhook = sqlx::query_as::<_, Webhook>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(webhook)
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Webhook>> {
        let query = format!(
            "SELECT {COLUMNS} FROM webhooks WHERE project_id = $1 ORDER BY created_at, id"
        );
        let webhooks = sqlx::query_as::<_, Webhook>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(webhooks)
    }

    async fn delete(&self, id: DbId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
