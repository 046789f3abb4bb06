//! Handlers for the public onboarding wizard.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use onboard_core::onboarding::OnboardingSubmission;
use onboard_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::services::onboarding::{self, OnboardingStatus, SubmissionResult};
use crate::state::AppState;

/// POST /api/onboarding/submit
///
/// Create the company, primary contact, project, module rows and checklist in
/// one transaction. Returns 201 with the new ids.
pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<OnboardingSubmission>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmissionResult>>)> {
    let result = onboarding::submit(&state, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}

/// GET /api/onboarding/status/{project_id}
pub async fn status(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<OnboardingStatus>>> {
    let status = onboarding::status(&state.repos, project_id).await?;
    Ok(Json(DataResponse { data: status }))
}
