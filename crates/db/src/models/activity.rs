//! Append-only project activity log.

use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Well-known activity action tags.
pub mod actions {
    pub const ONBOARDING_SUBMITTED: &str = "onboarding_submitted";
    pub const STATUS_CHANGED: &str = "status_changed";
    pub const STATUS_NOTIFICATION_SENT: &str = "status_notification_sent";
    pub const CHECKLIST_UPDATED: &str = "checklist_item_updated";
    pub const DOCUMENT_UPLOADED: &str = "document_uploaded";
    pub const DOCUMENT_DELETED: &str = "document_deleted";
    pub const DOCUMENT_REVIEWED: &str = "document_reviewed";
    pub const SOW_APPROVED: &str = "sow_approved";
    pub const WEBHOOK_CREATED: &str = "webhook_created";
    pub const WEBHOOK_DELETED: &str = "webhook_deleted";
    pub const INTEGRATION_UPDATED: &str = "integration_updated";
    pub const API_CREDENTIALS_REGENERATED: &str = "api_credentials_regenerated";
    pub const PROJECT_UPDATED: &str = "project_updated";
}

/// A row from `activity_logs`. Never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: DbId,
    pub project_id: DbId,
    /// `None` means the system or an anonymous submitter.
    pub actor_id: Option<DbId>,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for appending an activity row.
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub project_id: DbId,
    pub actor_id: Option<DbId>,
    pub action: String,
    pub details: serde_json::Value,
}

impl CreateActivity {
    pub fn new(
        project_id: DbId,
        actor_id: Option<DbId>,
        action: &str,
        details: serde_json::Value,
    ) -> Self {
        Self {
            project_id,
            actor_id,
            action: action.to_string(),
            details,
        }
    }
}
