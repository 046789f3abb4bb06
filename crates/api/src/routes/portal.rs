//! Route definitions for the client portal.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use onboard_core::uploads::MAX_UPLOAD_BYTES;

use crate::handlers::portal;
use crate::state::AppState;

/// Headroom for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes mounted at `/portal`.
///
/// ```text
/// GET         /projects                                     list_projects
/// GET         /projects/{id}                                get_project
/// GET         /projects/{id}/checklist                      checklist
/// PATCH       /projects/{id}/checklist/{item_id}            update_checklist_item
/// GET, POST   /projects/{id}/documents                      list_documents, upload_document
/// POST        /projects/{id}/sow/approve                    approve_sow
/// GET         /projects/{id}/sow.pdf                        download_sow
/// GET         /projects/{id}/activity                       activity
/// GET, POST   /projects/{id}/webhooks                       list_webhooks, create_webhook
/// GET, PUT    /projects/{id}/integrations                   list_integrations, upsert_integration
/// GET         /projects/{id}/api-credentials                api_credentials
/// POST        /projects/{id}/api-credentials/regenerate     regenerate_api_credentials
/// GET         /documents/{id}/download                      download_document
/// DELETE      /documents/{id}                               delete_document
/// DELETE      /webhooks/{id}                                delete_webhook
/// GET, PATCH  /profile                                      get_profile, update_profile
/// GET         /team                                         list_team
/// POST        /team/invite                                  invite_team_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(portal::list_projects))
        .route("/projects/{id}", get(portal::get_project))
        .route("/projects/{id}/checklist", get(portal::checklist))
        .route(
            "/projects/{id}/checklist/{item_id}",
            patch(portal::update_checklist_item),
        )
        .route(
            "/projects/{id}/documents",
            get(portal::list_documents)
                .post(portal::upload_document)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/projects/{id}/sow/approve", post(portal::approve_sow))
        .route("/projects/{id}/sow.pdf", get(portal::download_sow))
        .route("/projects/{id}/activity", get(portal::activity))
        .route(
            "/projects/{id}/webhooks",
            get(portal::list_webhooks).post(portal::create_webhook),
        )
        .route(
            "/projects/{id}/integrations",
            get(portal::list_integrations).put(portal::upsert_integration),
        )
        .route("/projects/{id}/api-credentials", get(portal::api_credentials))
        .route(
            "/projects/{id}/api-credentials/regenerate",
            post(portal::regenerate_api_credentials),
        )
        .route("/documents/{id}/download", get(portal::download_document))
        .route("/documents/{id}", delete(portal::delete_document))
        .route("/webhooks/{id}", delete(portal::delete_webhook))
        .route(
            "/profile",
            get(portal::get_profile).patch(portal::update_profile),
        )
        .route("/team", get(portal::list_team))
        .route("/team/invite", post(portal::invite_team_member))
}
