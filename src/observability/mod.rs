//! # Observability Infrastructure
//!
//! Structured logging for Penwright. HTTP request tracing is attached in
//! [`crate::api::routes::build_router`] through `tower-http`.

pub mod logging;

pub use logging::{init_logging, log_config_info};
