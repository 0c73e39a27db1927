//! # sentinel-core
//!
//! Shared foundation for the Sentinel publishing pipeline.
//!
//! - Branded ID newtypes ([`ids`])
//! - The cross-cutting error taxonomy ([`errors`])
//! - The content data model ([`content`])
//! - Retry configuration and backoff math ([`retry`])

#![deny(unsafe_code)]

pub mod content;
pub mod errors;
pub mod ids;
pub mod retry;

pub use content::{ContentBody, ContentItem, ContentKind, Platform, ScoreSet, Sentiment};
pub use errors::{Result, SentinelError};
pub use ids::{ContentId, EntryId, SnapshotId};
pub use retry::{linear_backoff_delay, RetryPolicy};
