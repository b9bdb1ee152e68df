use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A booked transaction as reported by the bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
	/// Booking date of the transaction.
	pub date: NaiveDate,
	/// Name of the counterparty.
	pub applicant_name: String,
	/// Free-text purpose of the transaction.
	pub purpose: String,
	/// Signed amount in the account currency, exact decimal.
	pub amount: Decimal,
}

/// Error types for the FinTS transaction source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("FinTS dialog error: {0}")]
	DialogError(String),

	#[error("Statement parse error: {0}")]
	ParseError(String),

	#[error("TAN error: {0}")]
	TanError(String),
}
