//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- verified access token from the session cookie or a Bearer header.
//! - [`tenant::Tenant`] -- the resolved staff / portal-user context.
//! - [`tenant::RequireStaff`] -- rejects non-staff principals with 403.

pub mod auth;
pub mod tenant;
