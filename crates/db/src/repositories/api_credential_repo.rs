//! Repository for `api_credentials`.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::api_credential::ApiCredential;
use crate::repository::ApiCredentialRepository;

const COLUMNS: &str = "id, project_id, api_key, secret_hash, created_by, created_at, rotated_at";

/// Postgres-backed [`ApiCredentialRepository`].
pub struct ApiCredentialRepo {
    pool: PgPool,
}

impl ApiCredentialRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiCredentialRepository for ApiCredentialRepo {
    async fn find_for_project(&self, project_id: DbId) -> DbResult<Option<ApiCredential>> {
        let query = format!("SELECT {COLUMNS} FROM api_credentials WHERE project_id = $1");
        let credential = sqlx::query_as::<_, ApiCredential>(&query)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credential)
    }

    async fn replace(
        &self,
        project_id: DbId,
        api_key: &str,
        secret_hash: &str,
        created_by: Option<DbId>,
    ) -> DbResult<ApiCredential> {
        let query = format!(
            "INSERT INTO api_credentials (project_id, api_key, secret_hash, created_by)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (project_id) DO UPDATE SET
                api_key = EXCLUDED.api_key,
                secret_hash = EXCLUDED.secret_hash,
                created_by = EXCLUDED.created_by,
                rotated_at = NOW()
             RETURNING {COLUMNS}"
        );
        let credential = sqlx::query_as::<_, ApiCredential>(&query)
            .bind(project_id)
            .bind(api_key)
            .bind(secret_hash)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(credential)
    }
}
