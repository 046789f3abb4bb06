//! Request handlers.
//!
//! Handlers stay thin: they pull the principal and inputs out of the request,
//! delegate to [`crate::services`], and wrap the result in a
//! [`DataResponse`](crate::response::DataResponse) envelope.

pub mod admin;
pub mod auth;
pub mod invites;
pub mod onboarding;
pub mod portal;
pub mod storage;
