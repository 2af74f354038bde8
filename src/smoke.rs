//! End-to-end smoke test against a running service.
//!
//! Replays the full account lifecycle over HTTP with form bodies and checks
//! the status code of every step.

use anyhow::{Context, Result, anyhow, bail};
use clap::{
    Arg, ArgMatches, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::{APP_USER_AGENT, api::DEFAULT_SESSION_NAME};

pub const ARG_URL: &str = "url";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_NEW_PASSWORD: &str = "new-password";
pub const ARG_SESSION_NAME: &str = "session-name";

pub const DEFAULT_URL: &str = "http://127.0.0.1:5000/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub email: String,
    pub password: String,
    pub new_password: String,
    pub session_name: String,
}

impl Config {
    /// Parse smoke arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            matches
                .get_one::<String>(name)
                .cloned()
                .ok_or_else(|| anyhow!("missing required argument: --{name}"))
        };

        let raw_url = read(ARG_URL)?;
        let base_url = Url::parse(raw_url.trim_end_matches('/'))
            .with_context(|| format!("invalid --{ARG_URL}: {raw_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("--{ARG_URL} must use http or https, got {}", base_url.scheme());
        }

        Ok(Self {
            base_url,
            email: read(ARG_EMAIL)?,
            password: read(ARG_PASSWORD)?,
            new_password: read(ARG_NEW_PASSWORD)?,
            session_name: read(ARG_SESSION_NAME)?,
        })
    }
}

#[must_use]
pub fn command() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("smoke")
        .about("Exercise a running session-auth service end to end")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_URL)
                .long(ARG_URL)
                .help("Base URL of the API, including the /api/v1 prefix")
                .env("SESSION_AUTH_SMOKE_URL")
                .default_value(DEFAULT_URL),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .help("Email of the account to create")
                .env("SESSION_AUTH_SMOKE_EMAIL")
                .default_value("guillaume@holberton.io"),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Initial password")
                .env("SESSION_AUTH_SMOKE_PASSWORD")
                .default_value("b4l0u"),
        )
        .arg(
            Arg::new(ARG_NEW_PASSWORD)
                .long(ARG_NEW_PASSWORD)
                .help("Password set through the reset flow")
                .env("SESSION_AUTH_SMOKE_NEW_PASSWORD")
                .default_value("t4rt1fl3tt3"),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long(ARG_SESSION_NAME)
                .help("Name of the session cookie")
                .env("SESSION_NAME")
                .default_value(DEFAULT_SESSION_NAME),
        );

    crate::cli::commands::logging::with_args(command)
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResetTokenBody {
    reset_token: Option<String>,
}

/// HTTP client bound to one base URL. Cookies are attached explicitly so each
/// step controls whether a session is sent.
#[derive(Debug, Clone)]
pub struct SmokeClient {
    http: Client,
    base_url: Url,
    session_name: String,
}

impl SmokeClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url, session_name: String) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url,
            session_name,
        })
    }

    fn request(&self, method: Method, path: &str, session_id: Option<&str>) -> RequestBuilder {
        let url = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let request = self.http.request(method, url);
        match session_id {
            Some(id) => request.header(
                reqwest::header::COOKIE,
                format!("{}={id}", self.session_name),
            ),
            None => request,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register_user(&self, email: &str, password: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "users", None)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        let response = expect_status(response, StatusCode::CREATED, "register")?;

        let body: EmailBody = response.json().await?;
        match body.email {
            Some(returned) if returned.eq_ignore_ascii_case(email) => Ok(()),
            other => bail!("register: expected email {email}, got {other:?}"),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn log_in_wrong_password(&self, email: &str, password: &str) -> Result<()> {
        let response = self
            .request(Method::POST, "auth_session/login", None)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        expect_status(response, StatusCode::UNAUTHORIZED, "login with wrong password")?;
        Ok(())
    }

    /// Log in and return the session id set by the server.
    #[instrument(skip(self, password))]
    pub async fn log_in(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .request(Method::POST, "auth_session/login", None)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK, "login")?;

        let session_id = response
            .cookies()
            .find(|cookie| cookie.name() == self.session_name)
            .map(|cookie| cookie.value().to_string());
        session_id.ok_or_else(|| anyhow!("login: no {} cookie in response", self.session_name))
    }

    #[instrument(skip(self))]
    pub async fn profile_unlogged(&self) -> Result<()> {
        let response = self.request(Method::GET, "users/me", None).send().await?;
        expect_status(response, StatusCode::FORBIDDEN, "profile without session")?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn profile_logged(&self, session_id: &str) -> Result<()> {
        let response = self
            .request(Method::GET, "users/me", Some(session_id))
            .send()
            .await?;
        expect_status(response, StatusCode::OK, "profile with session")?;
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn log_out(&self, session_id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, "auth_session/logout", Some(session_id))
            .send()
            .await?;
        expect_status(response, StatusCode::OK, "logout")?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn reset_password_token(&self, email: &str) -> Result<String> {
        let response = self
            .request(Method::POST, "reset_password", None)
            .form(&[("email", email)])
            .send()
            .await?;
        let response = expect_status(response, StatusCode::OK, "reset token")?;

        let body: ResetTokenBody = response.json().await?;
        body.reset_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("reset token: response has no reset_token"))
    }

    #[instrument(skip(self, reset_token, new_password))]
    pub async fn update_password(
        &self,
        email: &str,
        reset_token: &str,
        new_password: &str,
    ) -> Result<()> {
        let response = self
            .request(Method::PUT, "reset_password", None)
            .form(&[
                ("email", email),
                ("reset_token", reset_token),
                ("new_password", new_password),
            ])
            .send()
            .await?;
        expect_status(response, StatusCode::OK, "update password")?;
        Ok(())
    }
}

fn expect_status(response: Response, expected: StatusCode, step: &str) -> Result<Response> {
    let actual = response.status();
    if actual == expected {
        debug!("{step}: {actual}");
        Ok(response)
    } else {
        bail!(
            "{step}: expected {}, got {}",
            expected.as_u16(),
            actual.as_u16()
        )
    }
}

/// Run every step in order, stopping at the first failure.
///
/// # Errors
/// Returns an error naming the step whose status did not match.
pub async fn run(config: &Config) -> Result<()> {
    let client = SmokeClient::new(config.base_url.clone(), config.session_name.clone())?;
    let email = config.email.as_str();

    client.register_user(email, &config.password).await?;
    client.log_in_wrong_password(email, &config.new_password).await?;
    client.profile_unlogged().await?;
    let session_id = client.log_in(email, &config.password).await?;
    client.profile_logged(&session_id).await?;
    client.log_out(&session_id).await?;
    let reset_token = client.reset_password_token(email).await?;
    client
        .update_password(email, &reset_token, &config.new_password)
        .await?;
    client.log_in(email, &config.new_password).await?;

    info!("smoke test passed against {}", config.base_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{self, AuthConfig, AuthState},
        store::MemoryStore,
    };
    use std::{net::SocketAddr, sync::Arc};
    use tokio::net::TcpListener;

    async fn spawn_server(config: AuthConfig) -> Result<SocketAddr> {
        let state = Arc::new(AuthState::new(config, Arc::new(MemoryStore::new())));
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, api::app(state).into_make_service()).await;
        });
        Ok(addr)
    }

    fn config_for(addr: SocketAddr, session_name: &str) -> Result<Config> {
        Ok(Config {
            base_url: Url::parse(&format!("http://{addr}/api/v1"))?,
            email: "smoke@example.com".to_string(),
            password: "b4l0u".to_string(),
            new_password: "t4rt1fl3tt3".to_string(),
            session_name: session_name.to_string(),
        })
    }

    #[tokio::test]
    async fn full_sequence_passes() -> Result<()> {
        let addr = spawn_server(AuthConfig::new()).await?;
        run(&config_for(addr, DEFAULT_SESSION_NAME)?).await
    }

    #[tokio::test]
    async fn custom_session_name() -> Result<()> {
        let addr =
            spawn_server(AuthConfig::new().with_session_name("sid".to_string())).await?;
        run(&config_for(addr, "sid")?).await
    }

    #[tokio::test]
    async fn second_run_fails_on_duplicate_register() -> Result<()> {
        let addr = spawn_server(AuthConfig::new()).await?;
        let config = config_for(addr, DEFAULT_SESSION_NAME)?;
        run(&config).await?;

        let result = run(&config).await;
        assert!(
            result
                .err()
                .is_some_and(|err| err.to_string() == "register: expected 201, got 400")
        );
        Ok(())
    }

    #[tokio::test]
    async fn wrong_cookie_name_fails_login_step() -> Result<()> {
        let addr = spawn_server(AuthConfig::new()).await?;
        let result = run(&config_for(addr, "other")?).await;
        assert!(
            result
                .err()
                .is_some_and(|err| err.to_string().contains("no other cookie"))
        );
        Ok(())
    }

    #[test]
    fn config_defaults() {
        temp_env::with_vars(
            [
                ("SESSION_AUTH_SMOKE_URL", None::<&str>),
                ("SESSION_AUTH_SMOKE_EMAIL", None),
                ("SESSION_AUTH_SMOKE_PASSWORD", None),
                ("SESSION_AUTH_SMOKE_NEW_PASSWORD", None),
                ("SESSION_NAME", None),
            ],
            || {
                let matches = command().get_matches_from(vec!["smoke"]);
                let config = Config::parse(&matches);
                assert!(config.is_ok());
                if let Ok(config) = config {
                    assert_eq!(config.base_url.as_str(), DEFAULT_URL);
                    assert_eq!(config.email, "guillaume@holberton.io");
                    assert_eq!(config.session_name, DEFAULT_SESSION_NAME);
                }
            },
        );
    }

    #[test]
    fn config_rejects_non_http_url() {
        temp_env::with_vars(
            [("SESSION_AUTH_SMOKE_URL", Some("ftp://127.0.0.1/api/v1"))],
            || {
                let matches = command().get_matches_from(vec!["smoke"]);
                assert!(Config::parse(&matches).is_err());
            },
        );
    }

    #[test]
    fn config_trims_trailing_slash() {
        temp_env::with_vars(
            [("SESSION_AUTH_SMOKE_URL", Some("http://localhost:5000/api/v1/"))],
            || {
                let matches = command().get_matches_from(vec!["smoke"]);
                let config = Config::parse(&matches);
                assert_eq!(
                    config.ok().map(|config| config.base_url.to_string()),
                    Some("http://localhost:5000/api/v1".to_string())
                );
            },
        );
    }
}
