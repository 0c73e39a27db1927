//! # sentinel-server
//!
//! Axum serving boundary over the pipeline: the login exchange, bearer-token
//! middleware, JSON read endpoints, and the on-demand publish trigger.

#![deny(unsafe_code)]

pub mod auth;
pub mod error;
pub mod health;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, SentinelServer};
