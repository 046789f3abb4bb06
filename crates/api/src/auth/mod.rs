//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing, strength scoring, temporary passwords.
//! - [`jwt`] -- access tokens, refresh tokens, and the [`jwt::TokenIssuer`] port.
//! - [`cookies`] -- the `sb-access-token` / `sb-refresh-token` pair.

pub mod cookies;
pub mod jwt;
pub mod password;
