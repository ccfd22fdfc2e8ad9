//! # Configuration Settings
//!
//! Defines the configuration structure for Penwright and the layered loader
//! (built-in defaults, optional TOML file, `PENWRIGHT__SECTION__KEY` environment).

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PENWRIGHT";

/// Minimum length accepted for the token signing secret
pub const MIN_SECRET_KEY_LENGTH: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Token and account configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Listing page sizes
    #[validate(nested)]
    pub pagination: PaginationConfig,

    /// Outgoing mail configuration
    #[validate(nested)]
    pub mail: MailConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Environment keys use a double underscore between segments, e.g.
    /// `PENWRIGHT__AUTH__SECRET_KEY` or `PENWRIGHT__SERVER__PORT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks that go beyond what the validator derive expresses
    fn validate_custom(&self) -> Result<()> {
        if !self.database.is_sqlite() {
            return Err(Error::validation("Database URL must start with 'sqlite:'"));
        }

        if self.auth.secret_key.len() < MIN_SECRET_KEY_LENGTH {
            return Err(Error::validation(format!(
                "Secret key must be at least {} characters long",
                MIN_SECRET_KEY_LENGTH
            )));
        }

        if let Some(admin_email) = &self.auth.admin_email {
            if crate::auth::validation::validate_email(admin_email).is_err() {
                return Err(Error::validation("Admin email is not a valid address"));
            }
        }

        url::Url::parse(&self.server.public_base_url)
            .map_err(|e| Error::validation(format!("Invalid public base URL: {}", e)))?;

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Externally visible base URL used for resource links
    #[validate(length(min = 1, message = "Public base URL cannot be empty"))]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be at most 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Create missing tables at startup
    pub bootstrap_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/penwright.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            bootstrap_schema: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Check if this points at an in-memory database
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Token signing and account configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthConfig {
    /// Process-wide secret used to sign every token
    #[validate(length(min = 1, message = "Secret key cannot be empty"))]
    pub secret_key: String,

    /// Accounts registering with this address receive the administrator role
    pub admin_email: Option<String>,

    /// Lifetime of account confirmation tokens
    #[validate(range(min = 1, message = "Confirmation TTL must be positive"))]
    pub confirmation_ttl_seconds: u64,

    /// Lifetime of password reset tokens
    #[validate(range(min = 1, message = "Reset TTL must be positive"))]
    pub reset_ttl_seconds: u64,

    /// Lifetime of email change tokens
    #[validate(range(min = 1, message = "Email change TTL must be positive"))]
    pub email_change_ttl_seconds: u64,

    /// Lifetime of API tokens issued by `GET /api/v1/token`
    #[validate(range(
        min = 60,
        max = 86400,
        message = "API token TTL must be between 1 minute and 24 hours"
    ))]
    pub api_token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "penwright-development-secret-change-me-in-production".to_string(),
            admin_email: None,
            confirmation_ttl_seconds: 3600,
            reset_ttl_seconds: 3600,
            email_change_ttl_seconds: 3600,
            api_token_ttl_seconds: 3600,
        }
    }
}

/// Page sizes for listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PaginationConfig {
    #[validate(range(min = 1, max = 500))]
    pub posts_per_page: u32,

    #[validate(range(min = 1, max = 500))]
    pub followers_per_page: u32,

    #[validate(range(min = 1, max = 500))]
    pub comments_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { posts_per_page: 20, followers_per_page: 50, comments_per_page: 30 }
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MailConfig {
    /// Prepended to every subject line
    pub subject_prefix: String,

    /// From address
    #[validate(length(min = 1, message = "Sender cannot be empty"))]
    pub sender: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "[Penwright] ".to_string(),
            sender: "Penwright Admin <noreply@penwright.local>".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "penwright".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}
