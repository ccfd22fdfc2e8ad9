//! # REST API
//!
//! Axum router, handlers and JSON shapes for the `/api/v1` surface. Every request
//! passes the Basic auth boundary; resource routes additionally refuse
//! unconfirmed accounts.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
