//! Tracing setup

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "LAUNCH_GATE_LOG";

/// Level used when neither the environment nor the configuration sets one
pub const DEFAULT_LEVEL: &str = "info";

/// Pick the filter directive: environment first, then configuration
pub fn directive(from_env: Option<String>, from_config: Option<&str>) -> String {
    from_env
        .filter(|v| !v.trim().is_empty())
        .or_else(|| from_config.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Log level declared in a configuration file, if it can be read
pub fn configured_level(config_path: &Path) -> Option<String> {
    gate_config::parse_file(config_path).ok()?.settings.log_level
}

/// Install the global subscriber, logging to stderr
pub fn init(config_level: Option<&str>) {
    let directive = directive(std::env::var(LOG_ENV).ok(), config_level);
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
