//! `tracing` setup shared by the binary and anything embedding the collector.
//!
//! Events always go to stderr. When a log directory is configured they are
//! also appended to a daily rolling file. Call [`init_logging`] once at
//! startup; later calls are no-ops.

use nf_core::{Error, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static INITIALISED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used as the log file name.
    pub app_name: &'static str,
    /// Directory for the rolling file sink. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
    /// Applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "newsfold",
            log_dir: None,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Map a `-v` count to a default filter: 0 is info, 1 debug, more is trace.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.default_filter = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string();
        self
    }
}

/// Install the global subscriber.
pub fn init_logging(config: LogConfig) -> Result<()> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = rolling::daily(dir, format!("{}.log", config.app_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("tracing setup failed: {}", e)))?;

    let _ = INITIALISED.set(());
    Ok(())
}
