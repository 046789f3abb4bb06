//! Uploaded project document model.

use onboard_core::status::DocumentStatus;
use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `documents` table. The blob lives in object storage.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a document row.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub project_id: DbId,
    pub name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_by: Option<DbId>,
}
