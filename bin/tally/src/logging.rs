//! Logging.

use tracing_subscriber::{filter::LevelFilter, EnvFilter};

const LOG_LEVEL_ENV_VAR: &str = "TALLY_LOG_LEVEL";
const LOG_FORMAT_JSON_ENV_VAR: &str = "TALLY_LOG_FORMAT_JSON";

/// Initializes the logging subsystem for `tracing`.
///
/// Reads the filtering directives from `TALLY_LOG_LEVEL`, defaulting to `INFO`. When `TALLY_LOG_FORMAT_JSON` is set to
/// `true` or `1`, logs are written as JSON, and otherwise in a compact human-readable format. Logs always go to standard
/// error, leaving standard output for serialized records.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let is_json = std::env::var(LOG_FORMAT_JSON_ENV_VAR)
        .map(|s| s.trim().to_lowercase())
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false);

    let level_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(level_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if is_json {
        builder
            .json()
            .flatten_event(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.compact().with_ansi(true).try_init()
    }
}
