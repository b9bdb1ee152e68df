//! FinTS bank integration module
//!
//! Provides the transaction source backing the sync engine: a FinTS 3.0
//! PIN/TAN client for fetching booked transactions, and the MT940 statement
//! parsing that turns the bank's response into `RawTransaction` values.
//! Session establishment and TAN challenges live entirely here; the sync
//! engine only ever sees the `TransactionSource` trait.

/// FinTS PIN/TAN dialog client
mod fints;
/// MT940 statement parsing
mod mt940;
/// Transaction and error types for the bank side
mod types;

pub use fints::{FintsClient, FintsConfig, SepaAccount, TanPrompt};
pub use types::*;

use chrono::NaiveDate;

/// Capability for fetching booked transactions from the bank.
#[async_trait::async_trait]
pub trait TransactionSource: Send + Sync {
	/// Fetch all transactions booked at or after `start_date`, in the order
	/// the bank reports them (oldest first).
	async fn fetch_transactions(
		&mut self,
		start_date: NaiveDate,
	) -> Result<Vec<RawTransaction>, SourceError>;
}
