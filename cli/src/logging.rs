use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Maps a configured level name to a tracing level. Unknown names fall back to `warn`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Level used when nothing was configured
pub fn resolve_level(log_level: Option<&str>) -> Level {
    log_level.map(parse_level).unwrap_or(Level::WARN)
}

/// Installs the stderr subscriber. Diagnostics stay off stdout so answers can be piped.
pub fn init(log_level: Option<&str>) -> Result<()> {
    let level = resolve_level(log_level);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}
