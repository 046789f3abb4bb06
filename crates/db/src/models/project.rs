//! Onboarding project model.

use chrono::NaiveDate;
use onboard_core::status::ProjectStatus;
use onboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `onboarding_projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub company_id: DbId,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    /// Finer-grained stage within `status`, e.g. `sow_approved`.
    pub substage: Option<String>,
    pub target_go_live_date: Option<NaiveDate>,
    pub actual_go_live_date: Option<NaiveDate>,
    pub sow_signed_at: Option<Timestamp>,
    pub sow_signed_by: Option<DbId>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Listing row: a project joined with its company name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSummary {
    pub id: DbId,
    pub company_id: DbId,
    pub company_name: String,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub target_go_live_date: Option<NaiveDate>,
    pub sow_signed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Staff-editable project fields. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub target_go_live_date: Option<NaiveDate>,
    pub actual_go_live_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Filters for project listings.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub company_id: Option<DbId>,
    pub status: Option<ProjectStatus>,
    pub limit: i64,
    pub offset: i64,
}
