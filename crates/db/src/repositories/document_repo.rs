//! Repository for the `documents` table.

use async_trait::async_trait;
use onboard_core::status::DocumentStatus;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::document::{CreateDocument, Document};
use crate::repository::DocumentRepository;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, name, storage_path, mime_type, size_bytes, status, \
                       uploaded_by, created_at, updated_at";

/// Postgres-backed [`DocumentRepository`].
pub struct DocumentRepo {
    pool: PgPool,
}

impl DocumentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for DocumentRepo {
    async fn create(&self, input: &CreateDocument) -> DbResult<Document> {
        let query = format!(
            "INSERT INTO documents (project_id, name, storage_path, mime_type, size_bytes, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let document = sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(&input.storage_path)
            .bind(&input.mime_type)
            .bind(input.size_bytes)
            .bind(input.uploaded_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(document)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Document>> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        let document = sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Document>> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents WHERE project_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let documents = sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(documents)
    }

    async fn update_status(
        &self,
        id: DbId,
        status: DocumentStatus,
    ) -> DbResult<Option<Document>> {
        let query = format!("UPDATE documents SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        let document = sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn delete(&self, id: DbId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
