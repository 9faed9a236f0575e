//! Process-wide tracing setup.

use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LogConfig;

pub const LOG_FILE_PREFIX: &str = "mmchat.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
    pub log_dir: Option<PathBuf>,
}

impl From<&LogConfig> for LoggingConfig {
    fn from(config: &LogConfig) -> Self {
        Self {
            level: config.level.clone(),
            json_format: config.json,
            log_dir: config.dir.clone(),
        }
    }
}

/// Keeps the non-blocking file writer flushing; hold it until shutdown.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::INFO)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .from_env_lossy()
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Records emitted through
/// the `log` facade are bridged into tracing.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    tracing_log::LogTracer::init()?;

    let stdout_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, file_guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
