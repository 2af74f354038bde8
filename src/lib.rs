//! # Session Auth
//!
//! `session-auth` is a small identity service built around cookie sessions.
//! Users register with an email and password, log in to receive an opaque
//! session id in a cookie, and present that cookie to reach their profile.
//! A one-time reset token lets a user change a forgotten password.
//!
//! ## Sessions
//!
//! - **Opaque ids:** Session ids are 32 random bytes, base64url encoded. Only a
//!   SHA-256 hash of the id is stored; the raw value lives in the cookie.
//! - **Expiry:** When a session duration is configured, a session created at
//!   `t` is valid until `t + duration`. A duration of zero or less disables expiry.
//!   Expired sessions are removed the first time they are looked up.
//!
//! ## Storage
//!
//! The [`store::Store`] trait abstracts users and sessions. An in-memory backend
//! is used when no DSN is configured; otherwise records live in Postgres.

pub mod api;
pub mod cli;
pub mod smoke;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
