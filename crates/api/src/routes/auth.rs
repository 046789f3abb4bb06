//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login                          -> request_code
/// POST /verify                         -> verify_code
/// POST /login-password                 -> login_password
/// POST /refresh                        -> refresh
/// POST /signout                        -> sign_out
/// GET  /me                             -> me (requires auth)
/// POST /set-password                   -> set_password (requires auth)
/// POST /forgot-password                -> forgot_password
/// POST /reset-password                 -> reset_password
/// GET  /validate-reset-token/{token}   -> validate_reset_token
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::request_code))
        .route("/verify", post(auth::verify_code))
        .route("/login-password", post(auth::login_password))
        .route("/refresh", post(auth::refresh))
        .route("/signout", post(auth::sign_out))
        .route("/me", get(auth::me))
        .route("/set-password", post(auth::set_password))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route(
            "/validate-reset-token/{token}",
            get(auth::validate_reset_token),
        )
}
