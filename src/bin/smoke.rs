use anyhow::Result;
use session_auth::{cli::telemetry, smoke};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = smoke::command().get_matches();

    let verbosity = matches
        .get_one::<u8>(session_auth::cli::commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or(0);
    // Step results are logged at info, so that is the floor.
    let level = match verbosity {
        0..=2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    telemetry::init(Some(level))?;

    let config = smoke::Config::parse(&matches)?;
    let result = smoke::run(&config).await;

    telemetry::shutdown_tracer();

    result
}
