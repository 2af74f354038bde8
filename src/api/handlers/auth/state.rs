//! Auth state and configuration.

use std::{fmt, str::FromStr, sync::Arc};

use crate::store::Store;

pub const DEFAULT_SESSION_NAME: &str = "_my_session_id";

/// Paths reachable without a session. Compared with a trailing slash; `*`
/// matches any suffix.
const DEFAULT_EXCLUDED_PATHS: &[&str] = &[
    "/",
    "/health/",
    "/openapi.json/",
    "/api/v1/status/",
    "/api/v1/users/",
    "/api/v1/auth_session/login/",
    "/api/v1/reset_password/",
];

/// Which authentication guard fronts the API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthType {
    /// No global guard; handlers still resolve sessions themselves.
    None,
    /// Sessions never expire.
    Session,
    /// Sessions expire after the configured duration.
    #[default]
    SessionExp,
    /// Expiring sessions persisted in the database.
    SessionDb,
}

impl AuthType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Session => "session_auth",
            Self::SessionExp => "session_exp_auth",
            Self::SessionDb => "session_db_auth",
        }
    }

    #[must_use]
    pub const fn guards_requests(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn requires_database(self) -> bool {
        matches!(self, Self::SessionDb)
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "session_auth" => Ok(Self::Session),
            "session_exp_auth" => Ok(Self::SessionExp),
            "session_db_auth" => Ok(Self::SessionDb),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    auth_type: AuthType,
    session_name: String,
    session_duration_seconds: i64,
    session_cookie_secure: bool,
    excluded_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            auth_type: AuthType::default(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_duration_seconds: 0,
            session_cookie_secure: false,
            excluded_paths: DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    #[must_use]
    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    #[must_use]
    pub fn with_session_duration_seconds(mut self, seconds: i64) -> Self {
        self.session_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Lifetime applied to sessions; `0` means they never expire.
    ///
    /// `session_auth` ignores the configured duration.
    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        match self.auth_type {
            AuthType::Session => 0,
            _ => self.session_duration_seconds.max(0),
        }
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }
}

/// Shared state injected into handlers via `Extension<Arc<AuthState>>`.
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn Store>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .field("store", &self.store.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_type_parses_known_values() {
        assert_eq!("session_auth".parse(), Ok(AuthType::Session));
        assert_eq!("SESSION_EXP_AUTH".parse(), Ok(AuthType::SessionExp));
        assert_eq!("session_db_auth".parse(), Ok(AuthType::SessionDb));
        assert_eq!("none".parse(), Ok(AuthType::None));
        assert!("basic_auth".parse::<AuthType>().is_err());
    }

    #[test]
    fn auth_type_round_trips_display() {
        for auth_type in [
            AuthType::None,
            AuthType::Session,
            AuthType::SessionExp,
            AuthType::SessionDb,
        ] {
            assert_eq!(auth_type.to_string().parse(), Ok(auth_type));
        }
    }

    #[test]
    fn session_ttl_depends_on_auth_type() {
        let config = AuthConfig::new().with_session_duration_seconds(60);
        assert_eq!(config.session_ttl_seconds(), 60);

        let config = config.with_auth_type(AuthType::Session);
        assert_eq!(config.session_ttl_seconds(), 0);

        let config = AuthConfig::new().with_session_duration_seconds(-5);
        assert_eq!(config.session_ttl_seconds(), 0);
    }

    #[test]
    fn defaults() {
        let config = AuthConfig::new();
        assert_eq!(config.session_name(), "_my_session_id");
        assert_eq!(config.auth_type(), AuthType::SessionExp);
        assert!(!config.session_cookie_secure());
        assert!(
            config
                .excluded_paths()
                .contains(&"/api/v1/auth_session/login/".to_string())
        );
    }
}
