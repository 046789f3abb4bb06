//! External-system integration settings.

use onboard_core::status::IntegrationStatus;
use onboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `integration_configs`; one per system type per project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IntegrationConfig {
    pub id: DbId,
    pub project_id: DbId,
    pub system_type: String,
    pub settings: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub status: IntegrationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create-or-replace request for one integration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertIntegration {
    pub system_type: String,
    #[serde(default)]
    pub settings: serde_json::Value,
    pub status: Option<IntegrationStatus>,
}
