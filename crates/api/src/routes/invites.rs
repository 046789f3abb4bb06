//! Route definitions for the `/invites` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::invites;
use crate::state::AppState;

/// Routes mounted at `/invites`.
///
/// ```text
/// GET, POST  /                     list, create (staff)
/// GET        /{id}                 get_by_id (staff)
/// POST       /{id}/revoke          revoke (staff)
/// POST       /{id}/resend          resend (staff)
/// GET        /validate/{token}     validate (public)
/// POST       /accept               accept (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(invites::list).post(invites::create))
        .route("/validate/{token}", get(invites::validate))
        .route("/accept", post(invites::accept))
        .route("/{id}", get(invites::get_by_id))
        .route("/{id}/revoke", post(invites::revoke))
        .route("/{id}/resend", post(invites::resend))
}
