//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick default levels from the `debug` config flag
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over the defaults
//! - Safe to call more than once (later calls are ignored)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives for the given verbosity.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "fimiproxy=debug,tower_http=debug"
    } else {
        "fimiproxy=info,tower_http=info"
    }
}

/// Install the global subscriber.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_raises_level() {
        assert!(default_directives(true).contains("fimiproxy=debug"));
        assert!(default_directives(false).contains("fimiproxy=info"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(false);
        init_logging(true);
    }
}
