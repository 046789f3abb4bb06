//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) where the entity is mutable

pub mod activity;
pub mod api_credential;
pub mod checklist;
pub mod company;
pub mod contact;
pub mod document;
pub mod email_log;
pub mod integration;
pub mod invite;
pub mod login_code;
pub mod module;
pub mod onboarding;
pub mod password_reset;
pub mod principal;
pub mod project;
pub mod session;
pub mod user;
pub mod webhook;
