// promptgate/src/logger.rs
//! Logger bootstrap for the promptgate binary.

use log::LevelFilter;

/// Initializes the global `env_logger` instance.
///
/// An explicit `level` overrides `RUST_LOG`; `None` leaves the environment
/// configuration in charge. Safe to call more than once (later calls are
/// no-ops), which keeps tests that each initialize logging from panicking.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}
