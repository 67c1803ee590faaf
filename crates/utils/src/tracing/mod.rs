use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Default filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the tracing system
///
/// Honours `RUST_LOG` and falls back to `default_filter`. Output goes to
/// stderr in the compact format, with ANSI colours only when stderr is a
/// terminal.
pub fn init_with(default_filter: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Initialize the tracing system with the default `info` filter
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with(DEFAULT_FILTER)
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one cache operation against the active driver
pub fn cache_span(operation: &str, driver: &str) -> Span {
    span!(Level::DEBUG, "cache", operation = %operation, driver = %driver)
}

/// Span covering one throttled call
pub fn throttle_span(hash: &str) -> Span {
    span!(Level::DEBUG, "throttle", hash = %hash)
}
