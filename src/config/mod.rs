//! # Configuration Management
//!
//! Typed application settings, validated with `validator` and loaded through the
//! `config` crate. See [`settings::AppConfig::load`] for the layering rules.

pub mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, MailConfig, ObservabilityConfig, PaginationConfig,
    ServerConfig, ENV_PREFIX,
};
