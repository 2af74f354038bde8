use crate::api::{AuthType, DEFAULT_SESSION_NAME};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_AUTH_TYPE: &str = "auth-type";
pub const ARG_SESSION_NAME: &str = "session-name";
pub const ARG_SESSION_DURATION: &str = "session-duration";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";

#[derive(Debug, Clone)]
pub struct Options {
    pub auth_type: AuthType,
    pub session_name: String,
    pub session_duration_seconds: i64,
    pub session_cookie_secure: bool,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the session name is blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let session_name = matches
            .get_one::<String>(ARG_SESSION_NAME)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow::anyhow!("--{ARG_SESSION_NAME} must not be empty"))?;

        Ok(Self {
            auth_type: matches
                .get_one::<AuthType>(ARG_AUTH_TYPE)
                .copied()
                .unwrap_or_default(),
            session_name,
            session_duration_seconds: matches
                .get_one::<i64>(ARG_SESSION_DURATION)
                .copied()
                .unwrap_or(0),
            session_cookie_secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_TYPE)
                .long(ARG_AUTH_TYPE)
                .help("Authentication guard: none, session_auth, session_exp_auth, session_db_auth")
                .env("AUTH_TYPE")
                .default_value(AuthType::default().as_str())
                .value_parser(|value: &str| value.parse::<AuthType>()),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long(ARG_SESSION_NAME)
                .help("Name of the session cookie")
                .env("SESSION_NAME")
                .default_value(DEFAULT_SESSION_NAME),
        )
        .arg(
            Arg::new(ARG_SESSION_DURATION)
                .long(ARG_SESSION_DURATION)
                .help("Session lifetime in seconds, 0 or less never expires")
                .env("SESSION_DURATION")
                .default_value("0")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
