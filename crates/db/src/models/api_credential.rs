//! Per-project API key/secret pairs.

use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `api_credentials`. The secret is stored only as a hash.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiCredential {
    pub id: DbId,
    pub project_id: DbId,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub rotated_at: Timestamp,
}

/// Returned exactly once after regeneration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCredentialCreated {
    pub id: DbId,
    pub project_id: DbId,
    pub api_key: String,
    pub api_secret: String,
    pub rotated_at: Timestamp,
}
