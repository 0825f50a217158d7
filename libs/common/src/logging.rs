//! Unified logging module for ACN host tools
//!
//! Installs a console subscriber with a bracketed level format and a
//! reloadable filter so the level can be raised while a port is running.

use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_subscriber::{
    fmt::{
        self,
        format::Writer,
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::error::{Error, Result};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2025-12-02T00:50:44.809Z [INFO] Port opened`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Dynamic log level reload support
type EnvFilterReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
static LOG_FILTER_HANDLE: OnceLock<EnvFilterReloadHandle> = OnceLock::new();
static CURRENT_LOG_LEVEL: OnceLock<Mutex<String>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Application name, gets its own `name=level` directive
    pub app_name: String,
    /// Console log level
    pub console_level: Level,
    /// Enable JSON format for structured logging
    pub enable_json: bool,
    /// Colourise the bracketed level
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "acn".to_string(),
            console_level: Level::INFO,
            enable_json: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        let level = self.console_level.as_str().to_lowercase();
        format!("{},{}={}", level, self.app_name.replace('-', "_"), level)
    }
}

/// Initialize logging system with configuration
///
/// `RUST_LOG` wins over the configured level when present. Calling this a
/// second time returns an error and leaves the first subscriber in place.
pub fn init_with_config(config: LogConfig) -> Result<()> {
    let filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| config.default_filter());
    let env_filter = EnvFilter::try_new(&filter_str)
        .map_err(|e| Error::Logging(format!("Invalid filter '{}': {}", filter_str, e)))?;

    let (reload_filter, reload_handle) = reload::Layer::new(env_filter);

    let console_layer = if config.enable_json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_ansi(config.ansi)
            .event_format(BracketedLevelFormat)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(reload_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    let _ = LOG_FILTER_HANDLE.set(reload_handle);
    let current = CURRENT_LOG_LEVEL.get_or_init(|| Mutex::new(String::new()));
    if let Ok(mut guard) = current.lock() {
        *guard = filter_str.clone();
    }

    tracing::debug!("Logging: {} @ {}", config.app_name, filter_str);
    Ok(())
}

/// Parse a plain level string ("debug", "info", ...)
pub fn parse_level(level: &str) -> Result<Level> {
    level
        .trim()
        .parse()
        .map_err(|_| Error::Logging(format!("Invalid log level '{}'", level)))
}

/// Initialize with a plain level string ("debug", "info", ...)
pub fn init(level: &str) -> Result<()> {
    let config = LogConfig {
        console_level: parse_level(level)?,
        ..Default::default()
    };
    init_with_config(config)
}

/// Dynamically set log filter level at runtime
///
/// Accepts a bare level or a full filter spec (e.g. `info,acn_comlink=trace`).
pub fn set_log_level(level: &str) -> Result<()> {
    let handle = LOG_FILTER_HANDLE
        .get()
        .ok_or_else(|| Error::Logging("Logging not initialized with reload support".into()))?;

    let new_filter = EnvFilter::try_new(level)
        .map_err(|e| Error::Logging(format!("Invalid log level '{}': {}", level, e)))?;

    handle
        .reload(new_filter)
        .map_err(|e| Error::Logging(format!("Failed to reload log filter: {}", e)))?;

    if let Some(current) = CURRENT_LOG_LEVEL.get() {
        if let Ok(mut guard) = current.lock() {
            *guard = level.to_string();
        }
    }

    tracing::info!("Log level changed to: {}", level);
    Ok(())
}

/// Get current log filter level
pub fn get_log_level() -> String {
    CURRENT_LOG_LEVEL
        .get()
        .and_then(|m| m.lock().ok())
        .map(|guard| guard.clone())
        .unwrap_or_else(|| "unknown".to_string())
}
