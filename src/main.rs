mod bank;
mod config;
mod driver;
mod sync;
mod ynab;

use std::io::{self, Write};
use std::process::ExitCode;

use tracing::{error, info};

use crate::bank::{FintsClient, FintsConfig, SourceError, TanPrompt};
use crate::config::Config;
use crate::driver::SyncDriver;
use crate::sync::cursor::FileCursorStore;
use crate::sync::{CycleConfig, SyncCycle};
use crate::ynab::YnabClient;

/// Answers TAN challenges from the terminal.
struct StdinTanPrompt;

impl TanPrompt for StdinTanPrompt {
	fn request_tan(&self, challenge: &str) -> Result<String, SourceError> {
		println!("TAN required: {}", challenge);
		prompt_secret("Please enter TAN").map_err(|e| SourceError::TanError(e.to_string()))
	}
}

fn prompt_secret(label: &str) -> io::Result<String> {
	print!("{}: ", label);
	io::stdout().flush()?;
	let mut value = String::new();
	io::stdin().read_line(&mut value)?;
	Ok(value.trim().to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting FinTS to YNAB sync service");

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Configuration error: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let pin = match config.fints_pin.clone() {
		Some(pin) => pin,
		None => match prompt_secret("FinTS PIN") {
			Ok(pin) => pin,
			Err(e) => {
				error!("Failed to read PIN: {}", e);
				return ExitCode::FAILURE;
			}
		},
	};

	// The access token is only needed when records are actually submitted.
	let access_token = if config.inspect {
		config.ynab_access_token.clone().unwrap_or_default()
	} else {
		match config.ynab_access_token.clone() {
			Some(token) => token,
			None => match prompt_secret("YNAB Access Token") {
				Ok(token) => token,
				Err(e) => {
					error!("Failed to read access token: {}", e);
					return ExitCode::FAILURE;
				}
			},
		}
	};

	let mut fints_client = FintsClient::new(FintsConfig {
		endpoint: config.fints_endpoint.clone(),
		bank_code: config.fints_bank_code.clone(),
		login: config.fints_login.clone(),
		pin,
		product_id: config.fints_product_id.clone(),
	});

	if let Err(e) = fints_client.initialize_dialog(&StdinTanPrompt).await {
		error!("Failed to establish FinTS dialog: {}", e);
		return ExitCode::FAILURE;
	}

	let accounts = match fints_client.sepa_accounts().await {
		Ok(accounts) => accounts,
		Err(e) => {
			error!("Failed to list SEPA accounts: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let Some(account) = accounts
		.iter()
		.find(|account| account.iban == config.fints_iban)
		.cloned()
	else {
		error!("Could not find account, is the IBAN correct?");
		error!("Available accounts: {:?}", accounts);
		return ExitCode::FAILURE;
	};
	info!("Selected account {}", account.iban);
	fints_client.select_account(account);

	let ynab_client = YnabClient::new(config.ynab_budget_id.clone(), access_token);

	let mut cycle = SyncCycle::new(
		Box::new(fints_client),
		Box::new(ynab_client),
		Box::new(FileCursorStore::new(config.state_path.clone())),
		CycleConfig {
			account_id: config.ynab_account_id.clone(),
			start_date: config.start_date,
			inspect: config.inspect,
		},
	);

	let driver = SyncDriver::new(config.sleep_interval);
	driver
		.run(&mut cycle, async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await;

	info!("Sync service stopped");
	ExitCode::SUCCESS
}
