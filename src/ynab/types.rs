//! Types for the YNAB v1 transactions API

use serde::{Deserialize, Serialize};

/// A transaction in the shape the YNAB API accepts.
///
/// Field names match the wire format of `POST /budgets/{id}/transactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YnabTransaction {
    /// The YNAB account the transaction belongs to.
    pub account_id: String,
    /// Booking date as an ISO-8601 string.
    pub date: String,
    /// Amount in milliunits of the account currency.
    pub amount: i64,
    /// Counterparty name shown as the payee.
    pub payee_name: String,
    /// Free-text memo.
    pub memo: String,
    /// Cleared status; always "cleared" for imported bank bookings.
    pub cleared: String,
}

/// Request body of the bulk-create endpoint.
#[derive(Debug, Serialize)]
pub struct CreateTransactionsRequest<'a> {
    pub transactions: &'a [YnabTransaction],
}

/// Response envelope of the bulk-create endpoint.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionsResponse {
    pub data: CreatedTransactions,
}

#[derive(Debug, Deserialize)]
pub struct CreatedTransactions {
    pub transaction_ids: Vec<String>,
}

/// Error types for YNAB API operations
#[derive(Debug, thiserror::Error)]
pub enum YnabError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: HTTP {status}: {body}")]
    ApiError {
        status: reqwest::StatusCode,
        body: String,
    },
}
