//! # Structured Logging
//!
//! Subscriber installation and span helpers built on the `tracing` ecosystem.
//! Text output is the default; JSON output is selected with
//! `observability.json_logging` for log shippers.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when it is set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry.with(fmt::layer().json().with_current_span(true).with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::config(format!("Failed to install tracing subscriber: {}", e)))
}

/// Create a tracing span for request tracking.
///
/// Each span gets a fresh `request_id`. The two-argument form leaves
/// `account_id` empty for the auth middleware to record.
///
/// ```rust,ignore
/// let span = request_span!("GET", "/api/v1/posts/");
/// let span = request_span!("POST", "/api/v1/posts/", account_id = 7);
/// ```
#[macro_export]
macro_rules! request_span {
    ($method:expr, $path:expr) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            account_id = tracing::field::Empty
        )
    };
    ($method:expr, $path:expr, $($field:tt)*) => {
        tracing::info_span!(
            "http_request",
            method = %$method,
            path = %$path,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        server_address = %config.server.bind_address(),
        public_base_url = %config.server.public_base_url,
        database_memory = config.database.is_memory(),
        admin_email_configured = config.auth.admin_email.is_some(),
        posts_per_page = config.pagination.posts_per_page,
        json_logging = config.observability.json_logging,
        "Penwright configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_span_fields() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = request_span!("GET", "/api/v1/posts/");
            let metadata = span.metadata().expect("span enabled");
            assert_eq!(metadata.name(), "http_request");
            for name in ["method", "path", "request_id", "account_id"] {
                assert!(metadata.fields().field(name).is_some(), "{name}");
            }

            let span = request_span!("POST", "/api/v1/posts/", account_id = 7);
            assert!(span.metadata().expect("span enabled").fields().field("account_id").is_some());
        });
    }

    #[test]
    fn test_log_config_info() {
        let config = AppConfig::default();
        log_config_info(&config);
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config =
            ObservabilityConfig { log_level: "penwright=loud".to_string(), ..Default::default() };
        assert!(matches!(init_logging(&config), Err(Error::Config(_))));
    }
}
