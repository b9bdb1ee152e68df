//!
//! HTTP client for the YNAB v1 API.
//!
//! One call per sync cycle: a single bulk POST of all new transactions to
//! the budget's transactions endpoint, authenticated with a bearer token.
//! Any non-2xx response fails the whole cycle; nothing is retried here.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use super::types::*;

/// Base URL of the YNAB v1 API.
pub const YNAB_BASE_URL: &str = "https://api.youneedabudget.com/v1";

/// Capability for submitting normalized records to the budgeting service.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
	/// Submit a batch of records, returning the created transaction ids.
	async fn submit(&self, records: &[YnabTransaction]) -> Result<Vec<String>, YnabError>;
}

/// YNAB API client bound to one budget.
pub struct YnabClient {
	http_client: Client,
	base_url: String,
	budget_id: String,
	access_token: String,
}

impl YnabClient {
	pub fn new(budget_id: String, access_token: String) -> Self {
		Self::with_base_url(YNAB_BASE_URL.to_string(), budget_id, access_token)
	}

	pub fn with_base_url(base_url: String, budget_id: String, access_token: String) -> Self {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			base_url,
			budget_id,
			access_token,
		}
	}
}

#[async_trait::async_trait]
impl RecordSink for YnabClient {
	async fn submit(&self, records: &[YnabTransaction]) -> Result<Vec<String>, YnabError> {
		let url = format!("{}/budgets/{}/transactions", self.base_url, self.budget_id);
		debug!("Submitting {} record(s) to {}", records.len(), url);

		let request_body = CreateTransactionsRequest {
			transactions: records,
		};

		let response = self
			.http_client
			.post(&url)
			.bearer_auth(&self.access_token)
			.json(&request_body)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(YnabError::ApiError { status, body });
		}

		let response: CreateTransactionsResponse = response.json().await?;
		info!(
			"YNAB created {} transaction id(s)",
			response.data.transaction_ids.len()
		);
		Ok(response.data.transaction_ids)
	}
}
