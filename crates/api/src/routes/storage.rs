//! Route definitions for signed object downloads.

use axum::routing::get;
use axum::Router;

use crate::handlers::storage;
use crate::state::AppState;

/// Routes mounted at `/storage`.
///
/// ```text
/// GET /{*key}?expires=&signature=   download
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{*key}", get(storage::download))
}
