//! Internal logging macros
//!
//! These compile to nothing unless the `logging` feature is enabled, in
//! which case they forward to the `log` crate.

/// Debug-level logging - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Debug-level logging - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

/// Warn-level logging - no-op when logging feature is disabled
#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

/// Warn-level logging - use log crate when logging feature is enabled
#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}
