//! Incremental Synchronization Engine
//!
//! This module provides the core logic that decides which bank transactions
//! are new since the last successful run and moves them into YNAB at most
//! once. It is composed of several submodules, each responsible for a
//! specific aspect of the process:
//!
//! - `hasher`: stable identity fingerprints for transactions, the dedup key.
//! - `cursor`: the persisted (date, identity) position and its store.
//! - `dedup`: resume-point resolution against the stored identity.
//! - `transform`: mapping bank transactions onto YNAB's record shape.
//! - `cycle`: the orchestrated fetch -> dedup -> transform -> submit ->
//!   persist pass, the unit of atomicity for retries.
//!
//! The cycle never retries on its own; a failed cycle leaves the cursor
//! untouched and the outer driver runs the same range again on the next
//! interval.

/// Cursor persistence and its store capability
pub mod cursor;
/// The orchestrated synchronization pass
pub mod cycle;
/// Resume-point resolution
pub mod dedup;
/// Transaction identity fingerprints
pub mod hasher;
/// Bank-to-YNAB record transformation
pub mod transform;

pub use cycle::*;

/// Error types for the synchronization cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Bank error: {0}")]
    BankError(#[from] crate::bank::SourceError),

    #[error("YNAB error: {0}")]
    YnabError(#[from] crate::ynab::YnabError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
