//! Authentication primitives.
//!
//! - [`password`] -- Argon2id hashing, verification and strength rules.
//! - [`jwt`] -- Access-token signing/validation and refresh-token helpers.
//! - [`cookie`] -- The `session_token` cookie carrying the access token.

pub mod cookie;
pub mod jwt;
pub mod password;
