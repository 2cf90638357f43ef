//! Core domain types for archive restore reconciliation.
//!
//! This crate defines the data model shared by all other crates:
//! - Chunk references and their derived storage keys
//! - Object state classification from storage probes
//! - Restore parameters (tier, retention, leniency policy)
//! - Stream selector parsing and matching
//! - Reconciliation reports
//! - Configuration types

pub mod chunk;
pub mod config;
pub mod error;
pub mod matcher;
pub mod object;
pub mod report;
pub mod restore;

pub use chunk::{ChunkRef, StorageKey, TimeRange};
pub use error::{Error, Result};
pub use matcher::{LabelMatcher, MatchOp, MatcherExpression};
pub use object::{HeadMetadata, ObjectState};
pub use report::{DispatchOutcome, ProbeTotals, ReconciliationReport, TenantStats};
pub use restore::{Leniency, RestoreParams, Tier};
