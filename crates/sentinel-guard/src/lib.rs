//! # sentinel-guard
//!
//! Safety layer for the publishing pipeline:
//!
//! - lexical screening with flag/quarantine severities ([`policy`], [`guard`])
//! - the durable alert log ([`repository`])
//! - AES-256-GCM content archives ([`archive`])
//! - the kill switch ([`kill`])

#![deny(unsafe_code)]

pub mod archive;
pub mod guard;
pub mod kill;
pub mod policy;
pub mod repository;
pub mod types;

pub use archive::{open, seal, ArchiveRepo, EncryptedArchive, EnvKeyProvider, FixedKeyProvider, KeyProvider};
pub use guard::SecurityGuard;
pub use kill::{kill_switch, KillReport};
pub use policy::{ScreeningOutcome, ScreeningPolicy, CRITICAL_TERMS, DENY_TERMS};
pub use repository::{AlertRepo, VerdictRepo};
pub use types::{AlertRecord, SecurityVerdict, VerdictStatus};
