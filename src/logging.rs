use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfiguration;

/// Keeps the background log writer alive; drop it last.
pub struct LoggingGuard(#[allow(dead_code)] WorkerGuard);

/// Installs the global subscriber. Logs go to the configured file (relative
/// to `config_dir`) or to stderr; stdout belongs to the lyrics display.
pub fn init_logging(cfg: &LoggingConfiguration, config_dir: &Path) -> anyhow::Result<LoggingGuard> {
    let (writer, guard) = match &cfg.file {
        Some(file) => {
            let path = config_dir.join(file);
            let dir = path.parent().unwrap_or(config_dir);
            std::fs::create_dir_all(dir)?;
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log file has no name: {}", path.display()))?;
            non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => non_blocking(std::io::stderr()),
    };

    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(&cfg.filter));

    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(cfg.file.is_none())
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(LoggingGuard(guard))
}
