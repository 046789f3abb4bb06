//! Checklist templates and per-project checklist items.

use onboard_core::status::ChecklistStatus;
use onboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `checklist_templates`; independent of any project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub sort_order: i32,
    pub is_active: bool,
}

/// A checklist item joined with its template's name, category and order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItem {
    pub id: DbId,
    pub project_id: DbId,
    pub template_id: DbId,
    pub name: String,
    pub category: String,
    pub sort_order: i32,
    #[sqlx(try_from = "String")]
    pub status: ChecklistStatus,
    pub notes: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Status change request for a checklist item.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChecklistItem {
    pub status: ChecklistStatus,
    pub notes: Option<String>,
}
