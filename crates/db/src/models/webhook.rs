//! Outbound webhook registrations.

use onboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `webhooks`. The signing secret is shown once at creation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Webhook {
    pub id: DbId,
    pub project_id: DbId,
    pub url: String,
    pub events: Vec<String>,
    #[serde(skip_serializing)]
    pub secret: String,
    pub is_active: bool,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// Request body for registering a webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWebhookRequest {
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
}

/// DTO for inserting a webhook.
#[derive(Debug, Clone)]
pub struct CreateWebhook {
    pub project_id: DbId,
    pub url: String,
    pub events: Vec<String>,
    pub secret: String,
    pub created_by: Option<DbId>,
}
