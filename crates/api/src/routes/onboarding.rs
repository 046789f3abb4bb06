//! Route definitions for the public onboarding wizard.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::onboarding;
use crate::state::AppState;

/// Routes mounted at `/onboarding`.
///
/// ```text
/// POST /submit                 -> submit
/// GET  /status/{project_id}    -> status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(onboarding::submit))
        .route("/status/{project_id}", get(onboarding::status))
}
