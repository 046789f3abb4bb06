//! Handlers for the `/invites` resource.
//!
//! Creation, listing, revocation and resending are staff-only. Validation
//! and acceptance are public: the token itself is the credential.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use onboard_core::types::DbId;
use onboard_db::models::invite::Invite;
use serde::Deserialize;

use super::auth::{start_session, SessionResponse};
use crate::error::AppResult;
use crate::middleware::tenant::RequireStaff;
use crate::response::{DataResponse, Page};
use crate::services::invites::{
    self, InviteCreated, InviteListParams, InviteValidation, Inviter, NewInvite, ResendOutcome,
};
use crate::services::tenant::TenantContext;
use crate::state::AppState;

/// Body of `POST /invites/accept`.
#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: String,
}

fn staff_name(context: &TenantContext) -> String {
    match context {
        TenantContext::Staff { name, .. } => name.clone(),
        TenantContext::PortalUser { .. } => String::new(),
    }
}

/// POST /api/invites
pub async fn create(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<NewInvite>,
) -> AppResult<(StatusCode, Json<DataResponse<InviteCreated>>)> {
    let inviter = Inviter {
        user_id: Some(tenant.user.user_id),
        name: staff_name(&tenant.context),
    };
    let created = invites::create(&state, &inviter, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/invites
pub async fn list(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<InviteListParams>,
) -> AppResult<Json<DataResponse<Page<Invite>>>> {
    let page = invites::list(&state.repos, params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/invites/{id}
pub async fn get_by_id(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invite>>> {
    let invite = invites::get_by_id(&state.repos, id).await?;
    Ok(Json(DataResponse { data: invite }))
}

/// POST /api/invites/{id}/revoke
pub async fn revoke(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Invite>>> {
    let invite = invites::revoke(&state.repos, id).await?;
    Ok(Json(DataResponse { data: invite }))
}

/// POST /api/invites/{id}/resend
pub async fn resend(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ResendOutcome>>> {
    let outcome = invites::resend(&state, id, &staff_name(&tenant.context)).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/invites/validate/{token}
///
/// Always 200; the body says whether the token is usable and why not.
pub async fn validate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<InviteValidation>>> {
    let validation = invites::validate(&state.repos, &token).await?;
    Ok(Json(DataResponse { data: validation }))
}

/// POST /api/invites/accept
pub async fn accept(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<AcceptInviteRequest>,
) -> AppResult<(CookieJar, Json<DataResponse<SessionResponse>>)> {
    let session = invites::accept(&state, &input.token, &input.password).await?;
    start_session(&state, jar, session).await
}
