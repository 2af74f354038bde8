pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_HOST: &str = "host";
pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("session-auth")
        .about("Cookie-based session authentication service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_HOST)
                .long(ARG_HOST)
                .help("Address to listen on")
                .default_value("0.0.0.0")
                .env("API_HOST"),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("5000")
                .env("API_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Postgres connection string. When unset, users and sessions are kept in memory and lost on restart.",
                )
                .env("SESSION_AUTH_DSN"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
