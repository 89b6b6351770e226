use lambda_basics_core::handler::HandlerLogLevel;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber for the operator-facing binaries.
///
/// `RUST_LOG` wins over `default_directive` when set. Safe to call more than once.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Installs the subscriber used inside the deployed handler.
///
/// Lambda timestamps and tags every log line itself, so time and target are omitted.
pub fn init_handler_tracing(level: HandlerLogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(handler_level_filter(level))
        .with_target(false)
        .without_time()
        .try_init();
}

pub fn handler_level_filter(level: HandlerLogLevel) -> LevelFilter {
    match level {
        HandlerLogLevel::Debug => LevelFilter::DEBUG,
        HandlerLogLevel::Info => LevelFilter::INFO,
        HandlerLogLevel::Error => LevelFilter::ERROR,
    }
}
