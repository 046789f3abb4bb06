//! Domain logic for the client onboarding platform.
//!
//! Everything here is free of database and HTTP concerns so it can be shared
//! by the persistence layer, the notification dispatcher, and the API server.

pub mod error;
pub mod hashing;
pub mod onboarding;
pub mod pagination;
pub mod roles;
pub mod status;
pub mod storage;
pub mod tokens;
pub mod types;
pub mod uploads;
