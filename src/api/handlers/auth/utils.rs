//! Small helpers for credential validation and token handling.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to read from the OS random source")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Create a new session id for the auth cookie.
/// The raw value is only returned to set the cookie; the store keeps a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    generate_token().context("failed to generate session token")
}

/// Create a new one-time password reset token.
pub(crate) fn generate_reset_token() -> Result<String> {
    generate_token().context("failed to generate reset token")
}

/// Hash a token so raw values never reach the store.
pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a password with Argon2id and a random salt, returning a PHC string.
///
/// Runs on the blocking pool so request workers stay responsive.
pub(crate) async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .context("password hashing task failed")?
}

/// Check a password against a stored PHC string on the blocking pool.
///
/// A malformed stored hash is an error, a mismatch is `Ok(false)`.
pub(crate) async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &stored_hash))
        .await
        .context("password verification task failed")?
}

fn hash_password_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

fn verify_password_blocking(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|err| anyhow!("invalid password hash: {err}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
