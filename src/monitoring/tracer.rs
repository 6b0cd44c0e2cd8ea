/*!
 * Structured Tracing
 * Subscriber setup for the tracing events the synchronizers emit
 *
 * The library itself only emits events (queueing, timeouts, cancellations,
 * handoffs). Binaries and tests that want to see them install a subscriber
 * through this module.
 */

use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that switches output to JSON
pub const TRACE_JSON_ENV: &str = "SYNC_TRACE_JSON";

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// `EnvFilter` directives
    pub filter: String,
    /// Emit JSON instead of compact human-readable lines
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    /// Read configuration from the environment
    ///
    /// Environment variables:
    /// - RUST_LOG: Set log level (default: info)
    /// - SYNC_TRACE_JSON: Enable JSON output (default: false)
    pub fn from_env() -> Self {
        let filter = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        let json = std::env::var(TRACE_JSON_ENV)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);
        Self { filter, json }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize structured tracing from the environment
///
/// # Panics
///
/// Panics if a global subscriber is already installed; use
/// [`try_init_tracing`] when that is possible.
pub fn init_tracing() {
    let config = TracingConfig::from_env();
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if config.json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Install a compact subscriber unless one is already set
///
/// Returns `true` if this call installed it. Meant for tests, where many
/// cases race to initialize.
pub fn try_init_tracing(config: &TracingConfig) -> bool {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().with_test_writer().compact())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.filter, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_bad_filter_falls_back() {
        let config = TracingConfig {
            filter: "[[[not a filter".to_string(),
            json: false,
        };
        // Must not panic
        let _ = config.env_filter();
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let config = TracingConfig {
            filter: "debug".to_string(),
            json: false,
        };
        let _ = try_init_tracing(&config);
        assert!(!try_init_tracing(&config));
        tracing::debug!("tracing ready");
    }
}
