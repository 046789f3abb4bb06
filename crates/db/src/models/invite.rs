//! Onboarding / team invite model.

use onboard_core::status::InviteStatus;
use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `invites` table.
///
/// The token is the bearer secret embedded in the invite link and is never
/// serialized to API responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invite {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub token: String,
    pub email: String,
    pub company_name: Option<String>,
    pub invited_by: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub status: InviteStatus,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub project_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invite {
    /// Still pending by status but past its expiry on the wall clock.
    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Company id recorded for team-member invites.
    pub fn metadata_company_id(&self) -> Option<DbId> {
        self.metadata.get("company_id").and_then(|v| v.as_i64())
    }

    /// Contact id recorded for team-member invites.
    pub fn metadata_contact_id(&self) -> Option<DbId> {
        self.metadata.get("contact_id").and_then(|v| v.as_i64())
    }
}

/// DTO for inserting an invite.
#[derive(Debug, Clone)]
pub struct CreateInvite {
    pub token: String,
    pub email: String,
    pub company_name: Option<String>,
    pub invited_by: Option<DbId>,
    pub expires_at: Timestamp,
    pub metadata: serde_json::Value,
}

/// Everything needed to redeem a team invite as a portal user.
#[derive(Debug, Clone)]
pub struct RedeemTeamInvite {
    pub token: String,
    pub email: String,
    pub password_hash: String,
    pub company_id: DbId,
    pub contact_id: DbId,
}

/// Filters for invite listings.
#[derive(Debug, Clone, Default)]
pub struct InviteFilter {
    pub status: Option<InviteStatus>,
    /// Case-insensitive substring match on the target email.
    pub email: Option<String>,
    pub limit: i64,
    pub offset: i64,
}
