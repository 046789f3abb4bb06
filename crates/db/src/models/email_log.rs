//! Append-only record of every outbound email attempt.

use onboard_core::status::EmailType;
use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `email_logs`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailLog {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub email_type: EmailType,
    pub recipient: String,
    pub subject: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub project_id: Option<DbId>,
    pub invite_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for appending an email log row.
#[derive(Debug, Clone)]
pub struct CreateEmailLog {
    pub email_type: EmailType,
    pub recipient: String,
    pub subject: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub project_id: Option<DbId>,
    pub invite_id: Option<DbId>,
}
