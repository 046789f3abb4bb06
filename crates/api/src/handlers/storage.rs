//! Serves stored objects behind signed URLs minted by the object store.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use onboard_core::error::CoreError;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query string of a signed URL.
#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: i64,
    pub signature: String,
}

/// GET /api/storage/{*key}?expires=&signature=
///
/// No session needed: the signature is the credential. Expired or tampered
/// links answer 403.
pub async fn download(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> AppResult<Response> {
    if !state.signer.verify(&key, query.expires, &query.signature) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Invalid or expired download link".into(),
        )));
    }

    let Some(data) = state.store.get(&key).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let file_name = key.rsplit('/').next().unwrap_or("download").to_string();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        data,
    )
        .into_response())
}
