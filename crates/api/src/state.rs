use std::sync::Arc;

use onboard_core::storage::{ObjectStore, UrlSigner};
use onboard_db::{DbPool, Repositories};
use onboard_events::Notifier;

use crate::auth::jwt::TokenIssuer;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is an `Arc` or a bundle of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Repository handles (Postgres in production, in-memory in tests).
    pub repos: Repositories,
    /// Connection pool for health checks. `None` on in-memory repositories.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    /// Email dispatcher.
    pub notifier: Notifier,
    /// Document blob storage.
    pub store: Arc<dyn ObjectStore>,
    /// Verifies signed download URLs minted by `store`.
    pub signer: UrlSigner,
    /// Session issuer.
    pub tokens: Arc<dyn TokenIssuer>,
}
