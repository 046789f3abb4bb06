//! Staff-only handlers under `/admin`.

use axum::extract::{Path, Query, State};
use axum::Json;
use onboard_core::status::DocumentStatus;
use onboard_core::types::DbId;
use onboard_db::models::company::Company;
use onboard_db::models::document::Document;
use onboard_db::models::email_log::EmailLog;
use onboard_db::models::project::{Project, ProjectSummary};
use onboard_events::BroadcastSummary;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::tenant::RequireStaff;
use crate::query::PaginationParams;
use crate::response::{DataResponse, Page};
use crate::services::invites;
use crate::services::projects::{self, AdminProjectUpdate, ProjectDetail, ProjectListParams};
use crate::services::team::{self, CompanyDetail};
use crate::services::documents;
use crate::state::AppState;

/// Body of `PATCH /admin/documents/{id}`.
#[derive(Debug, Deserialize)]
pub struct ReviewDocument {
    pub status: DocumentStatus,
}

/// `?project_id=&limit=&offset=` on the email log.
#[derive(Debug, Default, Deserialize)]
pub struct EmailLogParams {
    pub project_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExpiredInvites {
    pub expired: u64,
}

/// GET /api/admin/projects
pub async fn list_projects(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<DataResponse<Page<ProjectSummary>>>> {
    let page = projects::list(&state, &tenant.context, params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/admin/projects/{id}
pub async fn get_project(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let detail = projects::detail(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/admin/projects/{id}
///
/// A `status` change goes through the transition table and notifies the
/// project's contacts.
pub async fn update_project(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AdminProjectUpdate>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = projects::admin_update(&state, tenant.user.user_id, id, input).await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/admin/projects/{id}/notify
///
/// Email the current status to every contact of the project's company.
pub async fn notify_project(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BroadcastSummary>>> {
    let summary = projects::broadcast_status(&state, id).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/admin/companies
pub async fn list_companies(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Page<Company>>>> {
    let page = team::list_companies(&state.repos, &pagination).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/admin/companies/{id}
pub async fn get_company(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CompanyDetail>>> {
    let detail = team::company_detail(&state.repos, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/admin/documents/{id}
pub async fn review_document(
    RequireStaff(tenant): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewDocument>,
) -> AppResult<Json<DataResponse<Document>>> {
    let document = documents::review(&state, tenant.user.user_id, id, input.status).await?;
    Ok(Json(DataResponse { data: document }))
}

/// GET /api/admin/email-logs
pub async fn email_logs(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<EmailLogParams>,
) -> AppResult<Json<DataResponse<Vec<EmailLog>>>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let logs = state
        .repos
        .email_logs
        .list(params.project_id, limit, offset)
        .await?;
    Ok(Json(DataResponse { data: logs }))
}

/// POST /api/admin/invites/expire
///
/// Run the stale-invite sweep now instead of waiting for the background task.
pub async fn expire_invites(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ExpiredInvites>>> {
    let expired = invites::expire_old_invites(&state.repos).await?;
    Ok(Json(DataResponse {
        data: ExpiredInvites { expired },
    }))
}
