//! # sentinel-scheduler
//!
//! The schedule state machine: planning entries behind the verdict gate,
//! the atomic pending-to-due handoff, bounded linear-backoff retries, and
//! manual revival of abandoned entries.

#![deny(unsafe_code)]

pub mod repository;
pub mod service;
pub mod types;

pub use repository::ScheduleRepo;
pub use service::Scheduler;
pub use types::{EntryState, PublishOutcome, ScheduleEntry};
