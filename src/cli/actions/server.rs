use crate::{
    api::{self, AuthConfig, AuthState, AuthType},
    store::{MemoryStore, PgStore, Store},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub host: String,
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub auth_type: AuthType,
    pub session_name: String,
    pub session_duration_seconds: i64,
    pub session_cookie_secure: bool,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_auth_type(self.auth_type)
            .with_session_name(self.session_name.clone())
            .with_session_duration_seconds(self.session_duration_seconds)
            .with_session_cookie_secure(self.session_cookie_secure)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: Arc<dyn Store> = match &args.dsn {
        Some(dsn) => Arc::new(
            PgStore::connect(dsn.expose_secret())
                .await
                .context("Could not connect to the database")?,
        ),
        None => {
            warn!("No DSN configured, users and sessions are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let config = args.auth_config();
    if args.auth_type == AuthType::Session && args.session_duration_seconds > 0 {
        warn!("session_auth ignores the session duration, sessions never expire");
    }

    let auth_state = Arc::new(AuthState::new(config, store));

    api::new(&args.host, args.port, auth_state).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("{}:{}", args.host, args.port)),
        (
            "dsn",
            args.dsn
                .as_ref()
                .map_or_else(|| "none".to_string(), |dsn| redact_dsn(dsn.expose_secret())),
        ),
        ("auth_type", args.auth_type.to_string()),
        ("session_name", args.session_name.clone()),
        (
            "session_duration",
            format!("{}s", args.session_duration_seconds),
        ),
        (
            "session_cookie_secure",
            args.session_cookie_secure.to_string(),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://app:hunter2@db:5432/sessions"),
            "postgres://app:REDACTED@db:5432/sessions"
        );
        assert_eq!(
            redact_dsn("postgres://app@db/sessions"),
            "postgres://app@db/sessions"
        );
        assert_eq!(redact_dsn("not a url"), "invalid-dsn");
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
    }

    #[test]
    fn auth_config_from_args() {
        let args = Args {
            host: "127.0.0.1".to_string(),
            port: 5000,
            dsn: None,
            auth_type: AuthType::Session,
            session_name: "sid".to_string(),
            session_duration_seconds: 60,
            session_cookie_secure: true,
        };
        let config = args.auth_config();
        assert_eq!(config.auth_type(), AuthType::Session);
        assert_eq!(config.session_name(), "sid");
        assert_eq!(config.session_ttl_seconds(), 0);
        assert!(config.session_cookie_secure());
    }
}
