//! Thin logging facade for coindash
//!
//! Wraps the `log` macros with a per-subsystem tag so call sites read as
//! `logger::warning(LogTag::Cache, "...")` and output can be filtered per
//! module via `RUST_LOG=coindash::cache=debug` style directives.
//!
//! Binaries and tests call [`init`] once; library code only emits.

use std::sync::Once;

/// Subsystem tag attached to every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    Api,
    Cache,
    Scheduler,
    Retry,
    Market,
    Watchlist,
    Config,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Api => "coindash::api",
            LogTag::Cache => "coindash::cache",
            LogTag::Scheduler => "coindash::scheduler",
            LogTag::Retry => "coindash::retry",
            LogTag::Market => "coindash::market",
            LogTag::Watchlist => "coindash::watchlist",
            LogTag::Config => "coindash::config",
        }
    }
}

static INIT: Once = Once::new();

/// Initialize the logging backend. Safe to call more than once.
pub fn init() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let _ = env_logger::Builder::from_env(env).try_init();
    });
}

/// Log at ERROR level (critical failures).
pub fn error(tag: LogTag, message: &str) {
    log::error!(target: tag.as_str(), "{}", message);
}

/// Log at WARNING level (degraded but operational).
pub fn warning(tag: LogTag, message: &str) {
    log::warn!(target: tag.as_str(), "{}", message);
}

/// Log at INFO level (normal operation).
pub fn info(tag: LogTag, message: &str) {
    log::info!(target: tag.as_str(), "{}", message);
}

/// Log at DEBUG level (diagnostics, filtered out by default).
pub fn debug(tag: LogTag, message: &str) {
    log::debug!(target: tag.as_str(), "{}", message);
}

/// Log at VERBOSE level (very detailed tracing).
pub fn verbose(tag: LogTag, message: &str) {
    log::trace!(target: tag.as_str(), "{}", message);
}
