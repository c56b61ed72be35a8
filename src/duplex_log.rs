//! Logging for the exchange: `log` facade macros plus the `env_logger`
//! setup shared by the binary and the test suites.
//!
//! The receive and transmit loops log once per frame. Every macro expands
//! through [`__duplex_log!`], which skips formatting entirely when the level
//! is filtered out.

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

#[doc(hidden)]
#[macro_export]
macro_rules! __duplex_log {
    ($lvl:expr, $($arg:tt)+) => {{
        let lvl: log::Level = $lvl;
        if log::log_enabled!(lvl) {
            log::log!(lvl, $($arg)+);
        }
    }};
}

/// Per-frame progress.
#[macro_export]
macro_rules! duplex_debug {
    ($($arg:tt)+) => { $crate::__duplex_log!(log::Level::Debug, $($arg)+) };
}

/// Exchange lifecycle.
#[macro_export]
macro_rules! duplex_info {
    ($($arg:tt)+) => { $crate::__duplex_log!(log::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! duplex_warn {
    ($($arg:tt)+) => { $crate::__duplex_log!(log::Level::Warn, $($arg)+) };
}

/// Direction faults and failed sessions.
#[macro_export]
macro_rules! duplex_error {
    ($($arg:tt)+) => { $crate::__duplex_log!(log::Level::Error, $($arg)+) };
}

/// Installs `env_logger`, honouring `RUST_LOG` and falling back to
/// `default_filter`. Returns false if a logger was already installed.
pub fn init_logging(default_filter: &str) -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
