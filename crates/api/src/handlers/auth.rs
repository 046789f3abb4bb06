//! Handlers for the `/auth` resource.
//!
//! Successful sign-ins set the `sb-access-token` / `sb-refresh-token` cookie
//! pair; the access token is also returned in the body for API clients.

use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use onboard_core::error::CoreError;
use onboard_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::auth::cookies::{self, REFRESH_COOKIE};
use crate::auth::jwt::IssuedSession;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::auth::{self as auth_service, Me};
use crate::services::tenant::{resolve_context, TenantContext};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /auth/login` and `POST /auth/forgot-password`.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Body of `POST /auth/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// Body of `POST /auth/login-password`.
#[derive(Debug, Deserialize)]
pub struct PasswordLoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/set-password`.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Returned by every endpoint that starts a session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: DbId,
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub context: Option<TenantContext>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TokenValidity {
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Set cookies and build the body for a fresh session.
pub(crate) async fn start_session(
    state: &AppState,
    jar: CookieJar,
    session: IssuedSession,
) -> AppResult<(CookieJar, Json<DataResponse<SessionResponse>>)> {
    let context = resolve_context(&state.repos, session.user_id).await?;
    let jar = cookies::with_session(jar, &session, state.config.secure_cookies());
    Ok((
        jar,
        Json(DataResponse {
            data: SessionResponse {
                user_id: session.user_id,
                access_token: session.access_token,
                expires_in: session.access_expires_in,
                context,
            },
        }),
    ))
}

fn message(text: &'static str) -> Json<DataResponse<MessageResponse>> {
    Json(DataResponse {
        data: MessageResponse { message: text },
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/login
///
/// Email a one-time sign-in code. Answers the same for unknown addresses.
pub async fn request_code(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    auth_service::request_login_code(&state, &input.email).await?;
    Ok(message("If an account exists for this email, a sign-in code has been sent"))
}

/// POST /api/auth/verify
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<VerifyCodeRequest>,
) -> AppResult<(CookieJar, Json<DataResponse<SessionResponse>>)> {
    let session = auth_service::verify_login_code(&state, &input.email, &input.code).await?;
    start_session(&state, jar, session).await
}

/// POST /api/auth/login-password
pub async fn login_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<PasswordLoginRequest>,
) -> AppResult<(CookieJar, Json<DataResponse<SessionResponse>>)> {
    let session = auth_service::login_password(&state, &input.email, &input.password).await?;
    start_session(&state, jar, session).await
}

/// POST /api/auth/refresh
///
/// Rotate the refresh token carried in the refresh cookie. The token never
/// appears in a response body.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<DataResponse<SessionResponse>>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Refresh token required".into())))?;
    let session = auth_service::refresh(&state, &token).await?;
    start_session(&state, jar, session).await
}

/// POST /api/auth/signout
///
/// Revoke the refresh session if present and clear both cookies. Always
/// succeeds.
pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<DataResponse<MessageResponse>>) {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    auth_service::sign_out(&state, token.as_deref()).await;
    (cookies::cleared(jar), message("Signed out"))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Me>>> {
    let me = auth_service::me(&state, user.user_id).await?;
    Ok(Json(DataResponse { data: me }))
}

/// POST /api/auth/set-password
pub async fn set_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    auth_service::set_password(&state, user.user_id, &input.password).await?;
    Ok(message("Password updated"))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    auth_service::forgot_password(&state, &input.email).await?;
    Ok(message("If an account exists for this email, a reset link has been sent"))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    auth_service::reset_password(&state, &input.token, &input.password).await?;
    Ok(message("Password has been reset; please sign in"))
}

/// GET /api/auth/validate-reset-token/{token}
pub async fn validate_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<TokenValidity>>> {
    let valid = auth_service::validate_reset_token(&state, &token).await?;
    Ok(Json(DataResponse {
        data: TokenValidity { valid },
    }))
}
