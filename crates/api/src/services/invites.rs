//! Invite lifecycle: create, validate, redeem, revoke, resend, expire.
//!
//! An invite is a single-use token that moves `pending -> used | expired |
//! revoked`. Every transition out of `pending` is a conditional write, so two
//! racing redemptions cannot both succeed.

use chrono::{Duration, Utc};
use onboard_core::error::CoreError;
use onboard_core::status::InviteStatus;
use onboard_core::tokens::generate_token;
use onboard_core::types::DbId;
use onboard_db::models::invite::{CreateInvite, Invite, InviteFilter, RedeemTeamInvite};
use onboard_db::Repositories;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::auth::jwt::IssuedSession;
use crate::auth::password::{hash_password, validate_strength};
use crate::error::{AppError, AppResult};
use crate::response::Page;
use crate::state::AppState;

/// Upper bound on a caller-chosen invite lifetime.
pub const MAX_INVITE_EXPIRATION_DAYS: i64 = 90;

/// Input for [`create`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInvite {
    pub email: String,
    pub company_name: Option<String>,
    /// Defaults to the configured invite lifetime.
    pub expiration_days: Option<i64>,
    /// Free-form; team invites carry `company_id` and `contact_id`.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Who sent the invite, for the email body and the `invited_by` column.
#[derive(Debug, Clone)]
pub struct Inviter {
    pub user_id: Option<DbId>,
    pub name: String,
}

/// Result of [`create`]. A failed email never fails the invite.
#[derive(Debug, Serialize)]
pub struct InviteCreated {
    pub invite: Invite,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of [`validate`].
#[derive(Debug, Serialize)]
pub struct InviteValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite: Option<Invite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InviteValidation {
    fn ok(invite: Invite) -> Self {
        Self {
            valid: true,
            invite: Some(invite),
            error: None,
        }
    }

    fn rejected(message: &str) -> Self {
        Self {
            valid: false,
            invite: None,
            error: Some(message.to_string()),
        }
    }

    /// Turn a rejection into a 400 carrying its message.
    pub fn into_valid(self) -> Result<Invite, CoreError> {
        match (self.valid, self.invite) {
            (true, Some(invite)) => Ok(invite),
            _ => Err(CoreError::Validation(
                self.error.unwrap_or_else(|| "Invalid invite".into()),
            )),
        }
    }
}

/// Result of [`resend`].
#[derive(Debug, Serialize)]
pub struct ResendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Listing filter for [`list`].
#[derive(Debug, Default, Deserialize)]
pub struct InviteListParams {
    pub status: Option<InviteStatus>,
    pub email: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn normalize_email(email: &str) -> Result<String, CoreError> {
    let email = email.trim().to_lowercase();
    if email.validate_email() {
        Ok(email)
    } else {
        Err(CoreError::Validation("A valid email address is required".into()))
    }
}

/// Whole days left before `invite` expires, at least one.
fn days_remaining(invite: &Invite) -> i64 {
    let hours = (invite.expires_at - Utc::now()).num_hours();
    ((hours + 23) / 24).max(1)
}

/// Create a pending invite and email it.
pub async fn create(state: &AppState, inviter: &Inviter, input: NewInvite) -> AppResult<InviteCreated> {
    let email = normalize_email(&input.email)?;
    let days = input
        .expiration_days
        .unwrap_or(state.config.tokens.invite_expiration_days);
    if !(1..=MAX_INVITE_EXPIRATION_DAYS).contains(&days) {
        return Err(CoreError::Validation(format!(
            "Expiration must be between 1 and {MAX_INVITE_EXPIRATION_DAYS} days"
        ))
        .into());
    }
    let company_name = input
        .company_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let invite = state
        .repos
        .invites
        .create(&CreateInvite {
            token: generate_token(state.config.tokens.invite_token_bytes),
            email,
            company_name,
            invited_by: inviter.user_id,
            expires_at: Utc::now() + Duration::days(days),
            metadata: input.metadata.unwrap_or_else(|| serde_json::json!({})),
        })
        .await?;

    tracing::info!(invite_id = invite.id, email = %invite.email, expires_in_days = days, "Invite created");

    let outcome = state
        .notifier
        .send_invite(&invite, &inviter.name, days)
        .await;
    let warning = (!outcome.success).then(|| {
        format!(
            "Invite created but the email could not be sent: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        )
    });

    Ok(InviteCreated {
        invite,
        email_sent: outcome.success,
        warning,
    })
}

/// Check a token. Sweeps stale invites first, and flips this invite to
/// `expired` if it is pending but past its expiry.
pub async fn validate(repos: &Repositories, token: &str) -> AppResult<InviteValidation> {
    let swept = repos.invites.expire_stale(Utc::now()).await?;
    if swept > 0 {
        tracing::debug!(swept, "Expired stale invites during validation");
    }

    let Some(invite) = repos.invites.find_by_token(token).await? else {
        return Ok(InviteValidation::rejected("Invite not found"));
    };

    match invite.status {
        InviteStatus::Used => Ok(InviteValidation::rejected("This invite has already been used")),
        InviteStatus::Expired => Ok(InviteValidation::rejected("This invite has expired")),
        InviteStatus::Revoked => Ok(InviteValidation::rejected("This invite has been revoked")),
        InviteStatus::Pending if invite.is_past_expiry(Utc::now()) => {
            repos.invites.expire(invite.id).await?;
            Ok(InviteValidation::rejected("This invite has expired"))
        }
        InviteStatus::Pending => Ok(InviteValidation::ok(invite)),
    }
}

/// Consume a pending invite. `false` if it was not pending.
pub async fn mark_used(repos: &Repositories, token: &str, project_id: Option<DbId>) -> AppResult<bool> {
    Ok(repos.invites.mark_used(token, project_id).await?)
}

/// Revoke a pending invite.
pub async fn revoke(repos: &Repositories, id: DbId) -> AppResult<Invite> {
    let invite = get_by_id(repos, id).await?;
    if !repos.invites.revoke(id).await? {
        return Err(CoreError::Conflict(format!(
            "Only pending invites can be revoked (status is {})",
            invite.status
        ))
        .into());
    }
    tracing::info!(invite_id = id, "Invite revoked");
    get_by_id(repos, id).await
}

/// Re-send the original email. Only pending, unexpired invites qualify; the
/// token does not change.
pub async fn resend(state: &AppState, id: DbId, inviter_name: &str) -> AppResult<ResendOutcome> {
    let invite = get_by_id(&state.repos, id).await?;
    if invite.status != InviteStatus::Pending {
        return Ok(ResendOutcome {
            success: false,
            error: Some(format!("Cannot resend an invite that is {}", invite.status)),
        });
    }
    if invite.is_past_expiry(Utc::now()) {
        state.repos.invites.expire(invite.id).await?;
        return Ok(ResendOutcome {
            success: false,
            error: Some("This invite has expired".into()),
        });
    }

    let outcome = state
        .notifier
        .send_invite(&invite, inviter_name, days_remaining(&invite))
        .await;
    Ok(ResendOutcome {
        success: outcome.success,
        error: outcome.error,
    })
}

/// Flip every pending invite past its expiry to `expired`.
pub async fn expire_old_invites(repos: &Repositories) -> AppResult<u64> {
    let count = repos.invites.expire_stale(Utc::now()).await?;
    if count > 0 {
        tracing::info!(count, "Expired stale invites");
    }
    Ok(count)
}

pub async fn list(repos: &Repositories, params: InviteListParams) -> AppResult<Page<Invite>> {
    let (limit, offset) = crate::query::PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let filter = InviteFilter {
        status: params.status,
        email: params.email.map(|e| e.trim().to_lowercase()),
        limit,
        offset,
    };
    let items = repos.invites.list(&filter).await?;
    let total = repos.invites.count(&filter).await?;
    Ok(Page { items, total })
}

pub async fn get_by_id(repos: &Repositories, id: DbId) -> AppResult<Invite> {
    repos
        .invites
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Invite", id }))
}

/// Redeem a team invite: set a password, become a portal user of the
/// inviting company, and start a session.
///
/// Invites without a company in their metadata are redeemed through the
/// intake wizard instead.
pub async fn accept(state: &AppState, token: &str, password: &str) -> AppResult<IssuedSession> {
    let invite = validate(&state.repos, token).await?.into_valid()?;
    let (Some(company_id), Some(contact_id)) =
        (invite.metadata_company_id(), invite.metadata_contact_id())
    else {
        return Err(CoreError::Validation(
            "This invite must be redeemed through the onboarding form".into(),
        )
        .into());
    };

    let strength = validate_strength(password);
    if !strength.valid {
        return Err(CoreError::Validation(strength.message()).into());
    }

    if let Some(user) = state.repos.users.find_by_email(&invite.email).await? {
        if state.repos.principals.find_portal_user(user.id).await?.is_some()
            || state.repos.principals.find_staff(user.id).await?.is_some()
        {
            return Err(CoreError::Conflict("An account already exists for this email".into()).into());
        }
    }

    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = state
        .repos
        .invites
        .redeem_team_invite(&RedeemTeamInvite {
            token: token.to_string(),
            email: invite.email.clone(),
            password_hash,
            company_id,
            contact_id,
        })
        .await?
        .ok_or_else(|| CoreError::Conflict("This invite has already been used".into()))?;
    state.repos.users.record_login(user.id).await?;

    tracing::info!(invite_id = invite.id, user_id = user.id, company_id, "Team invite accepted");
    state.tokens.issue(user.id).await
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use onboard_db::models::contact::CreateContact;
    use onboard_core::status::ContactRole;

    use super::*;
    use crate::testing::{seed_submission, TestHarness};

    fn inviter() -> Inviter {
        Inviter {
            user_id: None,
            name: "Sam Staff".into(),
        }
    }

    fn new_invite(email: &str) -> NewInvite {
        NewInvite {
            email: email.into(),
            company_name: Some("Acme".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_sends_email_and_validates() {
        let h = TestHarness::new();
        let created = create(&h.state, &inviter(), new_invite("New@Client.example"))
            .await
            .unwrap();

        assert!(created.email_sent);
        assert!(created.warning.is_none());
        assert_eq!(created.invite.email, "new@client.example");
        assert_eq!(created.invite.token.len(), 64);
        assert!(h.mailer.last_to("new@client.example").is_some());

        let check = validate(&h.state.repos, &created.invite.token).await.unwrap();
        assert!(check.valid);
    }

    #[tokio::test]
    async fn email_failure_is_a_warning() {
        let h = TestHarness::new();
        h.mailer.fail_for("down@client.example");
        let created = create(&h.state, &inviter(), new_invite("down@client.example"))
            .await
            .unwrap();
        assert!(!created.email_sent);
        assert!(created.warning.is_some());
        assert_eq!(created.invite.status, InviteStatus::Pending);
    }

    #[tokio::test]
    async fn invalid_email_and_expiration_are_rejected() {
        let h = TestHarness::new();
        let err = create(&h.state, &inviter(), new_invite("not-an-email")).await;
        assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));

        let mut input = new_invite("ok@client.example");
        input.expiration_days = Some(0);
        let err = create(&h.state, &inviter(), input).await;
        assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn terminal_states_report_their_reason() {
        let h = TestHarness::new();
        let repos = &h.state.repos;

        let used = create(&h.state, &inviter(), new_invite("a@client.example")).await.unwrap();
        assert!(mark_used(repos, &used.invite.token, None).await.unwrap());
        assert!(!mark_used(repos, &used.invite.token, None).await.unwrap());
        let check = validate(repos, &used.invite.token).await.unwrap();
        assert_eq!(check.error.as_deref(), Some("This invite has already been used"));

        let revoked = create(&h.state, &inviter(), new_invite("b@client.example")).await.unwrap();
        revoke(repos, revoked.invite.id).await.unwrap();
        let check = validate(repos, &revoked.invite.token).await.unwrap();
        assert_eq!(check.error.as_deref(), Some("This invite has been revoked"));

        let check = validate(repos, "nope").await.unwrap();
        assert_eq!(check.error.as_deref(), Some("Invite not found"));
    }

    #[tokio::test]
    async fn past_expiry_invites_are_expired_lazily() {
        let h = TestHarness::new();
        let repos = &h.state.repos;
        let invite = repos
            .invites
            .create(&CreateInvite {
                token: "stale-token".into(),
                email: "late@client.example".into(),
                company_name: None,
                invited_by: None,
                expires_at: Utc::now() - Duration::minutes(1),
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        let check = validate(repos, "stale-token").await.unwrap();
        assert_eq!(check.error.as_deref(), Some("This invite has expired"));
        let stored = get_by_id(repos, invite.id).await.unwrap();
        assert_eq!(stored.status, InviteStatus::Expired);
        assert_eq!(expire_old_invites(repos).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn revoking_twice_conflicts() {
        let h = TestHarness::new();
        let created = create(&h.state, &inviter(), new_invite("c@client.example")).await.unwrap();
        revoke(&h.state.repos, created.invite.id).await.unwrap();
        let err = revoke(&h.state.repos, created.invite.id).await;
        assert_matches!(err, Err(AppError::Core(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn resend_only_for_pending() {
        let h = TestHarness::new();
        let created = create(&h.state, &inviter(), new_invite("d@client.example")).await.unwrap();

        let outcome = resend(&h.state, created.invite.id, "Sam").await.unwrap();
        assert!(outcome.success);
        assert_eq!(h.mailer.sent().len(), 2);

        revoke(&h.state.repos, created.invite.id).await.unwrap();
        let outcome = resend(&h.state, created.invite.id, "Sam").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(h.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn accept_team_invite_provisions_portal_user() {
        let h = TestHarness::new();
        let repos = &h.state.repos;
        let seeded = seed_submission(repos, "Acme", "owner@acme.example").await;
        let contact = repos
            .contacts
            .create(&CreateContact {
                company_id: seeded.company.id,
                first_name: "Tess".into(),
                last_name: "Mate".into(),
                email: "tess@acme.example".into(),
                phone: None,
                title: None,
                role: ContactRole::Technical,
            })
            .await
            .unwrap();
        let mut input = new_invite("tess@acme.example");
        input.metadata = Some(serde_json::json!({
            "company_id": seeded.company.id,
            "contact_id": contact.id,
        }));
        let created = create(&h.state, &inviter(), input).await.unwrap();

        let weak = accept(&h.state, &created.invite.token, "weak").await;
        assert_matches!(weak, Err(AppError::Core(CoreError::Validation(_))));

        let session = accept(&h.state, &created.invite.token, "GoodPass123!").await.unwrap();
        let portal = repos
            .principals
            .find_portal_user(session.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(portal.company_id, seeded.company.id);
        assert_eq!(portal.contact_id, contact.id);

        let again = accept(&h.state, &created.invite.token, "GoodPass123!").await;
        assert_matches!(again, Err(AppError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn onboarding_invites_cannot_be_accepted_directly() {
        let h = TestHarness::new();
        let created = create(&h.state, &inviter(), new_invite("e@client.example")).await.unwrap();
        let err = accept(&h.state, &created.invite.token, "GoodPass123!").await;
        assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));
    }
}
