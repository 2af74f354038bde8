//! Auth handlers and supporting modules.
//!
//! Sessions are opaque ids carried in a cookie (default name `_my_session_id`).
//! The global guard ([`principal::auth_guard`]) rejects requests to protected
//! paths with `403` when no live session backs them.
//!
//! ## Auth types
//!
//! - `none`: no guard, handlers resolve sessions on their own.
//! - `session_auth`: sessions never expire.
//! - `session_exp_auth`: sessions expire `SESSION_DURATION` seconds after creation.
//! - `session_db_auth`: like `session_exp_auth`, with sessions kept in Postgres.

pub(crate) mod principal;
pub(crate) mod reset_password;
pub(crate) mod session;
mod state;
pub(crate) mod types;
mod utils;

pub use principal::{CurrentUser, Principal, auth_guard, require_auth};
pub use state::{AuthConfig, AuthState, AuthType, DEFAULT_SESSION_NAME};
pub(crate) use utils::{hash_password, hash_token, normalize_email, valid_email};
