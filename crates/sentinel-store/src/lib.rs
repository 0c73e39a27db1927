//! # sentinel-store
//!
//! `SQLite` access layer for the publishing pipeline.
//!
//! - Pooled connections with WAL mode and pragma enforcement ([`connection`])
//! - Embedded schema migrations ([`migrations`])
//! - The store handle with wipe-epoch coordination ([`store`])
//! - Read-only content ingestion ([`content`])

#![deny(unsafe_code)]

pub mod connection;
pub mod content;
pub mod migrations;
pub mod store;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use content::ContentStore;
pub use migrations::run_migrations;
pub use store::{Store, WipeReport};
