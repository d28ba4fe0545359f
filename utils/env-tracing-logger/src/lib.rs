//! Console and file logging through `tracing`, filtered by `RUST_LOG`.

use std::path::PathBuf;

use time::{UtcOffset, format_description::well_known::Iso8601};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot determine local time offset: {0}")]
    Offset(#[from] time::error::ComponentRange),
    #[error("cannot create log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error(transparent)]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset or cannot be parsed.
    pub default_directive: String,
    /// Also write log messages, without colors, to this file.
    pub log_file: Option<PathBuf>,
    pub console: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_directive: "info".into(),
            log_file: None,
            console: true,
        }
    }
}

/// Build the filter from the value of `RUST_LOG`, falling back to
/// `default_directive`.
fn env_filter(rust_log: Option<&str>, default_directive: &str) -> Result<EnvFilter, Error> {
    if let Some(filter) = rust_log.and_then(|v| EnvFilter::try_new(v).ok()) {
        return Ok(filter);
    }
    Ok(EnvFilter::try_new(default_directive)?)
}

/// Start logging to console and file as configured by `opts`.
pub fn initiate_logging(opts: &LogOptions) -> Result<(), Error> {
    // Fixed offset of the timezone when logging starts.
    let timer = OffsetTime::new(
        UtcOffset::from_whole_seconds(chrono::Local::now().offset().local_minus_utc())?,
        Iso8601::DEFAULT,
    );

    let file_layer = match &opts.log_file {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| Error::LogFile {
                path: path.clone(),
                source,
            })?;
            Some(
                fmt::layer()
                    .with_timer(timer.clone())
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    let console_layer = opts.console.then(|| {
        fmt::layer()
            .with_timer(timer)
            .with_writer(std::io::stderr)
            .with_ansi(!cfg!(windows))
    });

    let rust_log = std::env::var("RUST_LOG").ok();
    let collector = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter(rust_log.as_deref(), &opts.default_directive)?);
    tracing::subscriber::set_global_default(collector)?;

    match &rust_log {
        Some(var) => tracing::debug!("logging initiated with RUST_LOG=\"{var}\""),
        None => tracing::debug!(
            "logging initiated with default filter \"{}\"",
            opts.default_directive
        ),
    }
    if let Some(path) = &opts.log_file {
        tracing::debug!("logging to file \"{}\"", path.display());
    }
    Ok(())
}
