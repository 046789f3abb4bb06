//! Business logic behind the HTTP handlers.
//!
//! Services take [`AppState`](crate::state::AppState) (or just the
//! repositories) plus an already-resolved [`tenant::TenantContext`], so they
//! are exercised directly in unit tests without going through Axum.

pub mod auth;
pub mod documents;
pub mod integrations;
pub mod invites;
pub mod onboarding;
pub mod projects;
pub mod sow_pdf;
pub mod team;
pub mod tenant;
