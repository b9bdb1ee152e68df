//! Process configuration.
//!
//! Everything is read once at startup from environment variables, into plain
//! values the rest of the program consumes. Secrets that may be absent from
//! the environment (PIN, access token) stay optional here; the bootstrap
//! prompts for them interactively before the first cycle.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

/// Default FinTS endpoint (ING-DiBa).
const DEFAULT_FINTS_ENDPOINT: &str = "https://fints.ing-diba.de/fints/";
/// Default German bank code (ING-DiBa).
const DEFAULT_BANK_CODE: &str = "50010517";
/// Default seconds between sync cycles.
const DEFAULT_SLEEP_INTERVAL: u64 = 300;

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fints_endpoint: String,
    pub fints_bank_code: String,
    pub fints_login: String,
    pub fints_pin: Option<String>,
    pub fints_product_id: Option<String>,
    pub fints_iban: String,
    pub ynab_account_id: String,
    pub ynab_budget_id: String,
    pub ynab_access_token: Option<String>,
    /// Fallback start date for the first cycle without persisted state.
    pub start_date: Option<NaiveDate>,
    /// Wait between sync cycles.
    pub sleep_interval: Duration,
    /// Surface records instead of submitting them.
    pub inspect: bool,
    /// Location of the persisted cursor file.
    pub state_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            fints_endpoint: optional("FINTS_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_FINTS_ENDPOINT.to_string()),
            fints_bank_code: optional("FINTS_BLZ")
                .unwrap_or_else(|| DEFAULT_BANK_CODE.to_string()),
            fints_login: required("FINTS_LOGIN")?,
            fints_pin: optional("FINTS_PIN"),
            fints_product_id: optional("FINTS_PRODUCT_ID"),
            fints_iban: required("FINTS_IBAN")?,
            ynab_account_id: required("YNAB_ACCOUNT_ID")?,
            ynab_budget_id: required("YNAB_BUDGET_ID")?,
            ynab_access_token: optional("YNAB_ACCESS_TOKEN"),
            start_date: parse_optional("START_DATE", |value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| e.to_string())
            })?,
            sleep_interval: parse_optional("SLEEP_INTERVAL", |value| {
                value.parse::<u64>().map_err(|e| e.to_string())
            })?
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_SLEEP_INTERVAL)),
            inspect: optional("DEBUG").as_deref() == Some("1"),
            state_path: optional("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("state")),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_optional<T>(
    name: &'static str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, ConfigError> {
    match optional(name) {
        None => Ok(None),
        Some(value) => parse(&value)
            .map(Some)
            .map_err(|reason| ConfigError::Invalid { name, reason }),
    }
}
