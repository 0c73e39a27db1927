//! # sentinel-publisher
//!
//! The simulated publishing boundary: per-platform post formatting, bearer
//! token issuance, deterministic engagement synthesis, idempotent publish
//! records, and the bounded batch pool that drains the due queue.

#![deny(unsafe_code)]

pub mod platform;
pub mod repository;
pub mod service;
pub mod token;

pub use platform::{
    format_post, EngagementMetrics, FormattedPost, PlatformClient, PlatformResponse,
    SimulatedPlatform,
};
pub use repository::{PublishRecord, PublishRecordRepo};
pub use service::{BatchReport, PublisherSimulator};
pub use token::{BearerTokenSource, PublisherClaims};
