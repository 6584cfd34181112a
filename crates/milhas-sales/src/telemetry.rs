//! # Telemetry
//!
//! Structured logging setup for hosts embedding the engine.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=milhas_sales=trace` - Trace the service layer only
//! - Default: [`DEFAULT_LOG_FILTER`]

use tracing_subscriber::EnvFilter;

/// Used when neither `RUST_LOG` nor the config provides a filter.
pub const DEFAULT_LOG_FILTER: &str = "info,milhas=debug,sqlx=warn";

/// Builds the filter: `RUST_LOG` first, then `configured`, then the default.
pub fn build_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(configured: Option<&str>) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(configured))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_tracing(Some("warn"));
        assert!(!init_tracing(None));
    }

    #[test]
    fn test_build_filter_accepts_default() {
        let filter = build_filter(None);
        assert!(!filter.to_string().is_empty());
    }
}
