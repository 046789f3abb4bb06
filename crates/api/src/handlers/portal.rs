//! Handlers for the client portal.
//!
//! Every route takes a [`Tenant`]; staff see every company, portal users only
//! their own. A project outside the caller's company answers 403.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use onboard_core::storage::SignedUrl;
use onboard_core::types::DbId;
use onboard_db::models::activity::ActivityLog;
use onboard_db::models::api_credential::{ApiCredential, ApiCredentialCreated};
use onboard_db::models::checklist::{ChecklistItem, UpdateChecklistItem};
use onboard_db::models::contact::Contact;
use onboard_db::models::document::Document;
use onboard_db::models::integration::{IntegrationConfig, UpsertIntegration};
use onboard_db::models::project::{Project, ProjectSummary};
use onboard_db::models::webhook::{CreateWebhookRequest, Webhook};

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::Tenant;
use crate::query::PaginationParams;
use crate::response::{DataResponse, Page};
use crate::services::documents::{self, Upload};
use crate::services::integrations::{self, WebhookCreated};
use crate::services::projects::{self, ProjectDetail, ProjectListParams};
use crate::services::team::{self, InviteTeamMember, Profile, ProfileUpdate, TeamInvite};
use crate::services::sow_pdf;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// GET /api/portal/projects
pub async fn list_projects(
    tenant: Tenant,
    State(state): State<AppState>,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<DataResponse<Page<ProjectSummary>>>> {
    let page = projects::list(&state, &tenant.context, params).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/portal/projects/{id}
pub async fn get_project(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let detail = projects::detail(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/portal/projects/{id}/checklist
pub async fn checklist(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChecklistItem>>>> {
    let items = projects::checklist(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// PATCH /api/portal/projects/{id}/checklist/{item_id}
pub async fn update_checklist_item(
    tenant: Tenant,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateChecklistItem>,
) -> AppResult<Json<DataResponse<ChecklistItem>>> {
    let item = projects::update_checklist_item(&state, &tenant.context, id, item_id, input).await?;
    Ok(Json(DataResponse { data: item }))
}

/// POST /api/portal/projects/{id}/sow/approve
pub async fn approve_sow(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = projects::approve_sow(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/portal/projects/{id}/sow.pdf
pub async fn download_sow(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let (file_name, bytes) = sow_pdf::render_for_project(&state, &tenant.context, id).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    ))
}

/// GET /api/portal/projects/{id}/activity
pub async fn activity(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ActivityLog>>>> {
    let entries = projects::activity(&state, &tenant.context, id, &pagination).await?;
    Ok(Json(DataResponse { data: entries }))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// GET /api/portal/projects/{id}/documents
pub async fn list_documents(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Document>>>> {
    let docs = documents::list(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: docs }))
}

/// POST /api/portal/projects/{id}/documents
///
/// Multipart upload; the file travels in the `file` field. Other fields are
/// ignored.
pub async fn upload_document(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let document = documents::upload(&state, &tenant.context, id, upload).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// GET /api/portal/documents/{id}/download
pub async fn download_document(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SignedUrl>>> {
    let url = documents::download_url(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: url }))
}

/// DELETE /api/portal/documents/{id}
pub async fn delete_document(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    documents::delete(&state, &tenant.context, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Profile and team
// ---------------------------------------------------------------------------

/// GET /api/portal/profile
pub async fn get_profile(
    tenant: Tenant,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = team::profile(&state, &tenant.context).await?;
    Ok(Json(DataResponse { data: profile }))
}

/// PATCH /api/portal/profile
pub async fn update_profile(
    tenant: Tenant,
    State(state): State<AppState>,
    Json(input): Json<ProfileUpdate>,
) -> AppResult<Json<DataResponse<Contact>>> {
    let contact = team::update_profile(&state, &tenant.context, input).await?;
    Ok(Json(DataResponse { data: contact }))
}

/// GET /api/portal/team
pub async fn list_team(
    tenant: Tenant,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Contact>>>> {
    let contacts = team::team(&state, &tenant.context).await?;
    Ok(Json(DataResponse { data: contacts }))
}

/// POST /api/portal/team/invite
pub async fn invite_team_member(
    tenant: Tenant,
    State(state): State<AppState>,
    Json(input): Json<InviteTeamMember>,
) -> AppResult<(StatusCode, Json<DataResponse<TeamInvite>>)> {
    let invited = team::invite_member(&state, &tenant.context, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: invited })))
}

// ---------------------------------------------------------------------------
// Webhooks, integrations, API credentials
// ---------------------------------------------------------------------------

/// GET /api/portal/projects/{id}/webhooks
pub async fn list_webhooks(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Webhook>>>> {
    let hooks = integrations::list_webhooks(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: hooks }))
}

/// POST /api/portal/projects/{id}/webhooks
pub async fn create_webhook(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateWebhookRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<WebhookCreated>>)> {
    let created = integrations::create_webhook(&state, &tenant.context, id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// DELETE /api/portal/webhooks/{id}
pub async fn delete_webhook(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    integrations::delete_webhook(&state, &tenant.context, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/portal/projects/{id}/integrations
pub async fn list_integrations(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<IntegrationConfig>>>> {
    let configs = integrations::list_integrations(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: configs }))
}

/// PUT /api/portal/projects/{id}/integrations
pub async fn upsert_integration(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpsertIntegration>,
) -> AppResult<Json<DataResponse<IntegrationConfig>>> {
    let config = integrations::upsert_integration(&state, &tenant.context, id, input).await?;
    Ok(Json(DataResponse { data: config }))
}

/// GET /api/portal/projects/{id}/api-credentials
///
/// `data` is null until a key has been generated.
pub async fn api_credentials(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<ApiCredential>>>> {
    let credential = integrations::api_credentials(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: credential }))
}

/// POST /api/portal/projects/{id}/api-credentials/regenerate
///
/// The secret is only ever returned here.
pub async fn regenerate_api_credentials(
    tenant: Tenant,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ApiCredentialCreated>>> {
    let created = integrations::regenerate_api_credentials(&state, &tenant.context, id).await?;
    Ok(Json(DataResponse { data: created }))
}
