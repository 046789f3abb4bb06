//! Sign-in flows: emailed one-time codes, password login, refresh, sign-out,
//! and password resets.
//!
//! Every flow that starts from an email address answers the same way whether
//! or not the address is known.

use chrono::{Duration, Utc};
use onboard_core::error::CoreError;
use onboard_core::hashing::sha256_hex;
use onboard_core::tokens::{
    generate_login_code, generate_token, DEFAULT_TOKEN_BYTES, MAX_LOGIN_CODE_ATTEMPTS,
};
use onboard_core::types::{DbId, Timestamp};
use onboard_db::models::contact::Contact;
use onboard_db::models::user::User;
use serde::Serialize;

use crate::auth::jwt::IssuedSession;
use crate::auth::password::{hash_password, validate_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::services::tenant::{resolve_context, TenantContext};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_CODE: &str = "Invalid or expired code";
const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Login codes are bound to the address they were sent to.
fn code_hash(email: &str, code: &str) -> String {
    sha256_hex(format!("{email}:{}", code.trim()).as_bytes())
}

fn ensure_active(user: &User) -> Result<(), CoreError> {
    if user.is_active {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Account is deactivated".into()))
    }
}

fn ensure_strong(password: &str) -> Result<(), CoreError> {
    let strength = validate_strength(password);
    if strength.valid {
        Ok(())
    } else {
        Err(CoreError::Validation(strength.message()))
    }
}

fn hash(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

/// Email a one-time sign-in code to `email` if it belongs to an active user.
///
/// A new code replaces any earlier one for the same address.
pub async fn request_login_code(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize(email);
    let Some(user) = state.repos.users.find_by_email(&email).await? else {
        tracing::info!(email = %email, "Login code requested for unknown email");
        return Ok(());
    };
    if !user.is_active {
        tracing::info!(user_id = user.id, "Login code requested for inactive user");
        return Ok(());
    }

    let mins = state.config.tokens.login_code_expiry_mins;
    let code = generate_login_code();
    state
        .repos
        .login_codes
        .replace_for_email(&email, &code_hash(&email, &code), Utc::now() + Duration::minutes(mins))
        .await?;

    let outcome = state.notifier.send_magic_link(&email, &code, mins).await;
    if !outcome.success {
        tracing::warn!(user_id = user.id, "Login code email failed");
    }
    Ok(())
}

/// Exchange a login code for a session. Each code works once and is burned
/// after [`MAX_LOGIN_CODE_ATTEMPTS`] wrong guesses.
pub async fn verify_login_code(state: &AppState, email: &str, code: &str) -> AppResult<IssuedSession> {
    let email = normalize(email);
    state
        .repos
        .login_codes
        .consume(&email, &code_hash(&email, code), MAX_LOGIN_CODE_ATTEMPTS)
        .await?
        .ok_or_else(|| {
            tracing::info!(email = %email, "Login code rejected");
            AppError::Core(CoreError::Unauthorized(INVALID_CODE.into()))
        })?;

    let user = state
        .repos
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CODE.into())))?;
    ensure_active(&user)?;

    state.repos.users.record_login(user.id).await?;
    tracing::info!(user_id = user.id, "Signed in with login code");
    state.tokens.issue(user.id).await
}

/// Email + password sign-in.
pub async fn login_password(state: &AppState, email: &str, password: &str) -> AppResult<IssuedSession> {
    let unauthorized = || AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));

    let user = state
        .repos
        .users
        .find_by_email(&normalize(email))
        .await?
        .ok_or_else(unauthorized)?;
    let stored = user.password_hash.as_deref().ok_or_else(unauthorized)?;

    let valid = verify_password(password, stored)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::info!(user_id = user.id, "Password sign-in rejected");
        return Err(unauthorized());
    }
    ensure_active(&user)?;

    state.repos.users.record_login(user.id).await?;
    tracing::info!(user_id = user.id, "Signed in with password");
    state.tokens.issue(user.id).await
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<IssuedSession> {
    state.tokens.refresh(refresh_token).await
}

/// Revoke the session behind `refresh_token`, if any. Never fails: the
/// caller clears cookies regardless.
pub async fn sign_out(state: &AppState, refresh_token: Option<&str>) {
    let Some(token) = refresh_token else {
        return;
    };
    if let Err(e) = state.tokens.revoke(token).await {
        tracing::warn!(error = %e, "Failed to revoke session on sign-out");
    }
}

/// Set or replace the signed-in user's password.
pub async fn set_password(state: &AppState, user_id: DbId, password: &str) -> AppResult<()> {
    ensure_strong(password)?;
    let password_hash = hash(password)?;
    if !state.repos.users.set_password_hash(user_id, &password_hash).await? {
        return Err(CoreError::NotFound { entity: "User", id: user_id }.into());
    }
    tracing::info!(user_id, "Password set");
    Ok(())
}

/// Email a reset link if `email` belongs to a user. Any earlier reset token
/// for that user stops working.
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize(email);
    let Some(user) = state.repos.users.find_by_email(&email).await? else {
        tracing::info!(email = %email, "Password reset requested for unknown email");
        return Ok(());
    };

    let hours = state.config.tokens.password_reset_expiration_hours;
    let token = generate_token(DEFAULT_TOKEN_BYTES);
    state
        .repos
        .password_resets
        .replace_for_user(user.id, &sha256_hex(token.as_bytes()), Utc::now() + Duration::hours(hours))
        .await?;

    let outcome = state.notifier.send_password_reset(&email, &token, hours).await;
    if !outcome.success {
        tracing::warn!(user_id = user.id, "Password reset email failed");
    }
    Ok(())
}

/// Whether a reset token is unused and unexpired.
pub async fn validate_reset_token(state: &AppState, token: &str) -> AppResult<bool> {
    Ok(state
        .repos
        .password_resets
        .find_valid(&sha256_hex(token.as_bytes()))
        .await?
        .is_some())
}

/// Consume a reset token and set a new password. All of the user's sessions
/// are revoked.
pub async fn reset_password(state: &AppState, token: &str, password: &str) -> AppResult<()> {
    ensure_strong(password)?;
    let invalid = || AppError::Core(CoreError::Validation(INVALID_RESET_TOKEN.into()));

    let reset = state
        .repos
        .password_resets
        .find_valid(&sha256_hex(token.as_bytes()))
        .await?
        .ok_or_else(invalid)?;
    if !state.repos.password_resets.mark_used(reset.id).await? {
        return Err(invalid());
    }

    let password_hash = hash(password)?;
    state
        .repos
        .users
        .set_password_hash(reset.user_id, &password_hash)
        .await?;
    let revoked = state.repos.sessions.revoke_all_for_user(reset.user_id).await?;
    tracing::info!(user_id = reset.user_id, revoked, "Password reset");
    Ok(())
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub has_password: bool,
    pub last_login_at: Option<Timestamp>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            has_password: user.password_hash.is_some(),
            last_login_at: user.last_login_at,
        }
    }
}

/// The signed-in principal as the UI sees it.
#[derive(Debug, Serialize)]
pub struct Me {
    pub user: UserInfo,
    /// `None` when the account is not yet provisioned.
    pub context: Option<TenantContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

pub async fn me(state: &AppState, user_id: DbId) -> AppResult<Me> {
    let user = state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id: user_id }))?;
    let context = resolve_context(&state.repos, user_id).await?;
    let contact = match &context {
        Some(TenantContext::PortalUser { contact_id, .. }) => {
            state.repos.contacts.find_by_id(*contact_id).await?
        }
        _ => None,
    };
    Ok(Me {
        user: UserInfo::from(&user),
        context,
        contact,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use onboard_db::models::user::CreateUser;

    use super::*;
    use crate::testing::TestHarness;

    async fn user_with_password(h: &TestHarness, email: &str, password: Option<&str>) -> User {
        h.state
            .repos
            .users
            .create(&CreateUser {
                email: email.into(),
                password_hash: password.map(|p| hash_password(p).unwrap()),
            })
            .await
            .unwrap()
    }

    /// Pull the 6-digit code out of the last email sent to `email`.
    fn code_from_mail(h: &TestHarness, email: &str) -> String {
        let mail = h.mailer.last_to(email).expect("code email sent");
        mail.text
            .split(|c: char| !c.is_ascii_digit())
            .find(|s| s.len() == 6)
            .expect("six digit code in body")
            .to_string()
    }

    #[tokio::test]
    async fn login_code_round_trip_is_single_use() {
        let h = TestHarness::new();
        let user = user_with_password(&h, "client@acme.example", None).await;

        request_login_code(&h.state, "Client@Acme.example").await.unwrap();
        let code = code_from_mail(&h, "client@acme.example");

        let session = verify_login_code(&h.state, "client@acme.example", &code).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(h.state.tokens.verify(&session.access_token).is_ok());

        let again = verify_login_code(&h.state, "client@acme.example", &code).await;
        assert_matches!(again, Err(AppError::Core(CoreError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn unknown_email_gets_same_answer_and_no_mail() {
        let h = TestHarness::new();
        request_login_code(&h.state, "ghost@nowhere.example").await.unwrap();
        forgot_password(&h.state, "ghost@nowhere.example").await.unwrap();
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn code_for_another_email_is_rejected() {
        let h = TestHarness::new();
        user_with_password(&h, "a@acme.example", None).await;
        user_with_password(&h, "b@acme.example", None).await;

        request_login_code(&h.state, "a@acme.example").await.unwrap();
        let code = code_from_mail(&h, "a@acme.example");
        let err = verify_login_code(&h.state, "b@acme.example", &code).await;
        assert_matches!(err, Err(AppError::Core(CoreError::Unauthorized(_))));
    }

    /// Any six-digit code other than `code`.
    fn wrong_code(code: &str) -> String {
        if code == "000000" { "000001" } else { "000000" }.to_string()
    }

    #[tokio::test]
    async fn wrong_guesses_burn_the_code() {
        let h = TestHarness::new();
        user_with_password(&h, "victim@acme.example", None).await;

        request_login_code(&h.state, "victim@acme.example").await.unwrap();
        let code = code_from_mail(&h, "victim@acme.example");
        let guess = wrong_code(&code);

        for _ in 0..MAX_LOGIN_CODE_ATTEMPTS {
            let err = verify_login_code(&h.state, "victim@acme.example", &guess).await;
            assert_matches!(err, Err(AppError::Core(CoreError::Unauthorized(_))));
        }

        let late = verify_login_code(&h.state, "victim@acme.example", &code).await;
        assert_matches!(late, Err(AppError::Core(CoreError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn code_survives_fewer_wrong_guesses_than_the_limit() {
        let h = TestHarness::new();
        let user = user_with_password(&h, "typo@acme.example", None).await;

        request_login_code(&h.state, "typo@acme.example").await.unwrap();
        let code = code_from_mail(&h, "typo@acme.example");
        for _ in 1..MAX_LOGIN_CODE_ATTEMPTS {
            let _ = verify_login_code(&h.state, "typo@acme.example", &wrong_code(&code)).await;
        }

        let session = verify_login_code(&h.state, "typo@acme.example", &code).await.unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn new_code_retires_the_previous_one() {
        let h = TestHarness::new();
        let user = user_with_password(&h, "twice@acme.example", None).await;

        request_login_code(&h.state, "twice@acme.example").await.unwrap();
        let first = code_from_mail(&h, "twice@acme.example");
        let mut second = first.clone();
        while second == first {
            request_login_code(&h.state, "twice@acme.example").await.unwrap();
            second = code_from_mail(&h, "twice@acme.example");
        }

        let stale = verify_login_code(&h.state, "twice@acme.example", &first).await;
        assert_matches!(stale, Err(AppError::Core(CoreError::Unauthorized(_))));
        let session = verify_login_code(&h.state, "twice@acme.example", &second).await.unwrap();
        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn password_login_checks_hash() {
        let h = TestHarness::new();
        user_with_password(&h, "pw@acme.example", Some("GoodPass123!")).await;
        user_with_password(&h, "nopw@acme.example", None).await;

        assert!(login_password(&h.state, "pw@acme.example", "GoodPass123!").await.is_ok());
        for (email, password) in [
            ("pw@acme.example", "WrongPass123!"),
            ("nopw@acme.example", "GoodPass123!"),
            ("ghost@acme.example", "GoodPass123!"),
        ] {
            let err = login_password(&h.state, email, password).await;
            assert_matches!(err, Err(AppError::Core(CoreError::Unauthorized(_))));
        }
    }

    #[tokio::test]
    async fn set_password_enforces_strength() {
        let h = TestHarness::new();
        let user = user_with_password(&h, "set@acme.example", None).await;

        let err = set_password(&h.state, user.id, "weak").await;
        assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));

        set_password(&h.state, user.id, "GoodPass123!").await.unwrap();
        assert!(login_password(&h.state, "set@acme.example", "GoodPass123!").await.is_ok());
    }

    #[tokio::test]
    async fn reset_flow_replaces_password_and_kills_sessions() {
        let h = TestHarness::new();
        user_with_password(&h, "reset@acme.example", Some("OldPass123!")).await;
        let session = login_password(&h.state, "reset@acme.example", "OldPass123!").await.unwrap();

        forgot_password(&h.state, "reset@acme.example").await.unwrap();
        let mail = h.mailer.last_to("reset@acme.example").unwrap();
        let token = mail
            .text
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string();

        assert!(validate_reset_token(&h.state, &token).await.unwrap());
        reset_password(&h.state, &token, "NewPass123!").await.unwrap();
        assert!(!validate_reset_token(&h.state, &token).await.unwrap());

        let reused = reset_password(&h.state, &token, "OtherPass123!").await;
        assert_matches!(reused, Err(AppError::Core(CoreError::Validation(_))));

        assert!(login_password(&h.state, "reset@acme.example", "NewPass123!").await.is_ok());
        assert!(refresh(&h.state, &session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn me_reports_unprovisioned_users() {
        let h = TestHarness::new();
        let user = user_with_password(&h, "me@acme.example", None).await;
        let me = me(&h.state, user.id).await.unwrap();
        assert_eq!(me.user.email, "me@acme.example");
        assert!(me.context.is_none());
        assert!(!me.user.has_password);
    }
}
