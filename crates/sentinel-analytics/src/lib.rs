//! # sentinel-analytics
//!
//! Engagement aggregation over publish records: grouped weighted scoring,
//! deterministic ranking, and the wholesale-replaced strategy suggestion
//! snapshot.

#![deny(unsafe_code)]

pub mod repository;
pub mod service;
pub mod types;

pub use repository::SuggestionRepo;
pub use service::{derive_suggestions, AnalyticsAggregator};
pub use types::{group_key, StrategySuggestion, SuggestionKind};
