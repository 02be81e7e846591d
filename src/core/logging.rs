//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info` and millisecond
/// timestamps. Override with the RUST_LOG environment variable.
///
/// # Example
/// ```no_run
/// blockworld::core::logging::init();
/// log::info!("World core started");
/// ```
pub fn init() {
    init_with_default_filter("info");
}

/// Initialize logging with a custom default filter (e.g. `"blockworld=debug"`).
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_default_filter(filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .try_init();
}
