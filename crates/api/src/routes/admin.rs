//! Route definitions for the staff console.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler requires a staff principal.
///
/// ```text
/// GET          /projects               list_projects
/// GET, PATCH   /projects/{id}          get_project, update_project
/// POST         /projects/{id}/notify   notify_project
/// GET          /companies              list_companies
/// GET          /companies/{id}         get_company
/// PATCH        /documents/{id}         review_document
/// GET          /email-logs             email_logs
/// POST         /invites/expire         expire_invites
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(admin::list_projects))
        .route(
            "/projects/{id}",
            get(admin::get_project).patch(admin::update_project),
        )
        .route("/projects/{id}/notify", post(admin::notify_project))
        .route("/companies", get(admin::list_companies))
        .route("/companies/{id}", get(admin::get_company))
        .route("/documents/{id}", patch(admin::review_document))
        .route("/email-logs", get(admin::email_logs))
        .route("/invites/expire", post(admin::expire_invites))
}
