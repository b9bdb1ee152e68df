//!
//! FinTS 3.0 PIN/TAN client.
//!
//! Speaks the segment-based FinTS dialog over HTTPS: a message is a sequence
//! of `'`-terminated segments, base64-encoded in transit. The client covers
//! exactly what the sync service needs: dialog initialization with PIN/TAN
//! (including a TAN challenge round-trip), SEPA account listing, and
//! statement retrieval (HKKAZ), whose MT940 payload is handed to the
//! statement parser.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info};

use super::mt940;
use super::types::{RawTransaction, SourceError};
use super::TransactionSource;

/// Capability for answering a TAN challenge with a secret.
///
/// Implemented by the bootstrap (e.g. a terminal prompt); the client never
/// reads secrets itself.
pub trait TanPrompt: Send + Sync {
	fn request_tan(&self, challenge: &str) -> Result<String, SourceError>;
}

/// Connection parameters for the bank's FinTS endpoint.
#[derive(Debug, Clone)]
pub struct FintsConfig {
	/// HTTPS endpoint of the bank's FinTS server.
	pub endpoint: String,
	/// German bank code (BLZ).
	pub bank_code: String,
	/// Online banking login name.
	pub login: String,
	/// Online banking PIN.
	pub pin: String,
	/// Registered FinTS product identifier, if any.
	pub product_id: Option<String>,
}

/// A SEPA account as reported by the bank (HISPA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SepaAccount {
	pub iban: String,
	pub account_number: String,
}

/// FinTS client holding one established dialog.
pub struct FintsClient {
	http_client: Client,
	config: FintsConfig,
	dialog_id: String,
	message_number: u32,
	system_id: String,
	account: Option<SepaAccount>,
}

impl FintsClient {
	pub fn new(config: FintsConfig) -> Self {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			config,
			dialog_id: "0".to_string(),
			message_number: 1,
			system_id: "0".to_string(),
			account: None,
		}
	}

	/// Open the PIN/TAN dialog, answering a TAN challenge if the bank
	/// issues one.
	pub async fn initialize_dialog(
		&mut self,
		tan_prompt: &dyn TanPrompt,
	) -> Result<(), SourceError> {
		info!("Initializing FinTS dialog with {}", self.config.endpoint);

		let product = self
			.config
			.product_id
			.clone()
			.unwrap_or_else(|| "fints-ynab-sync".to_string());
		let segments = vec![
			self.signature_head(),
			format!(
				"HKIDN:3:2+280:{}+{}+{}+1",
				self.config.bank_code, self.config.login, self.system_id
			),
			format!("HKVVB:4:3+0+0+1+{}+1.0", product),
			self.signature_trailer(5, None),
		];

		let response = self.exchange(&segments).await?;
		self.check_return_codes(&response)?;

		if let Some(dialog_id) = Self::header_field(&response, 3) {
			self.dialog_id = dialog_id;
		}

		if let Some(challenge) = Self::tan_challenge(&response) {
			info!("Bank requested a TAN to open the dialog");
			let tan = tan_prompt.request_tan(&challenge)?;
			self.send_tan(&tan).await?;
		}

		info!("FinTS dialog {} established", self.dialog_id);
		Ok(())
	}

	/// List the SEPA accounts reachable through this login.
	pub async fn sepa_accounts(&mut self) -> Result<Vec<SepaAccount>, SourceError> {
		let segments = vec![
			self.signature_head(),
			"HKSPA:3:1+".to_string(),
			self.signature_trailer(4, None),
		];

		let response = self.exchange(&segments).await?;
		self.check_return_codes(&response)?;

		let segment = Self::find_segment(&response, "HISPA").ok_or_else(|| {
			SourceError::DialogError("bank returned no SEPA account list".to_string())
		})?;

		let accounts = Self::parse_accounts(segment);
		info!("Bank reported {} SEPA account(s)", accounts.len());
		Ok(accounts)
	}

	/// Bind all further statement requests to the given account.
	pub fn select_account(&mut self, account: SepaAccount) {
		self.account = Some(account);
	}

	async fn send_tan(&mut self, tan: &str) -> Result<(), SourceError> {
		let segments = vec![
			self.signature_head(),
			"HKTAN:3:6+2".to_string(),
			self.signature_trailer(4, Some(tan)),
		];

		let response = self.exchange(&segments).await?;
		self.check_return_codes(&response)
			.map_err(|e| SourceError::TanError(e.to_string()))
	}

	/// Send one message and return the decoded response, bumping the
	/// dialog's message number.
	async fn exchange(&mut self, segments: &[String]) -> Result<String, SourceError> {
		let message = self.build_message(segments);
		debug!("FinTS request ({} segments)", segments.len());

		let response = self
			.http_client
			.post(&self.config.endpoint)
			.header("Content-Type", "text/plain")
			.body(BASE64.encode(message.as_bytes()))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(SourceError::DialogError(format!(
				"bank endpoint returned HTTP {}",
				status
			)));
		}

		let body = response.text().await?;
		let decoded = BASE64.decode(body.trim()).map_err(|e| {
			SourceError::DialogError(format!("response is not valid base64: {}", e))
		})?;

		self.message_number += 1;
		Ok(String::from_utf8_lossy(&decoded).into_owned())
	}

	/// Wrap business segments in the message header and trailer.
	fn build_message(&self, segments: &[String]) -> String {
		let head = format!(
			"HNHBK:1:3+000000000000+300+{}+{}'",
			self.dialog_id, self.message_number
		);
		let tail = format!("HNHBS:{}:1+{}'", segments.len() + 2, self.message_number);

		let mut message = String::from(head);
		for segment in segments {
			message.push_str(segment);
			message.push('\'');
		}
		message.push_str(&tail);

		// The HNHBK size field must hold the final byte length of the message.
		let size = format!("{:012}", message.len());
		message.replacen("000000000000", &size, 1)
	}

	fn signature_head(&self) -> String {
		format!(
			"HNSHK:2:4+PIN:1+999+1+1+1+{}+0+1+1:999:1+6:10:16+1:{}:{}",
			self.system_id, self.config.bank_code, self.config.login
		)
	}

	fn signature_trailer(&self, number: usize, tan: Option<&str>) -> String {
		match tan {
			Some(tan) => format!("HNSHA:{}:2+1++{}:{}", number, self.config.pin, tan),
			None => format!("HNSHA:{}:2+1++{}", number, self.config.pin),
		}
	}

	/// Split a FinTS message into its `'`-terminated segments.
	fn segments(message: &str) -> Vec<&str> {
		message.split('\'').filter(|s| !s.is_empty()).collect()
	}

	fn find_segment<'a>(message: &'a str, name: &str) -> Option<&'a str> {
		Self::segments(message)
			.into_iter()
			.find(|segment| segment.starts_with(name))
	}

	/// Data element at `index` (0 is the segment head) of the HNHBK header.
	fn header_field(message: &str, index: usize) -> Option<String> {
		let header = Self::find_segment(message, "HNHBK")?;
		header.split('+').nth(index).map(|field| field.to_string())
	}

	/// Fail on any 9xxx return code in the HIRMG/HIRMS feedback segments.
	fn check_return_codes(&self, message: &str) -> Result<(), SourceError> {
		for segment in Self::segments(message) {
			if !(segment.starts_with("HIRMG") || segment.starts_with("HIRMS")) {
				continue;
			}
			for feedback in segment.split('+').skip(1) {
				let mut parts = feedback.split(':');
				let code = parts.next().unwrap_or("");
				if code.starts_with('9') {
					let text = parts.nth(1).unwrap_or("").to_string();
					return Err(SourceError::DialogError(format!("{} {}", code, text)));
				}
			}
		}
		Ok(())
	}

	/// Challenge text of a HITAN segment, if the response carries one.
	fn tan_challenge(message: &str) -> Option<String> {
		let segment = Self::find_segment(message, "HITAN")?;
		let challenge = segment.split('+').nth(4)?;
		if challenge.is_empty() {
			None
		} else {
			Some(challenge.to_string())
		}
	}

	fn parse_accounts(segment: &str) -> Vec<SepaAccount> {
		let mut accounts = Vec::new();
		for entry in segment.split('+').skip(1) {
			let fields: Vec<&str> = entry.split(':').collect();
			if fields.len() < 4 || fields[0] != "J" {
				continue;
			}
			accounts.push(SepaAccount {
				iban: fields[1].to_string(),
				account_number: fields[3].to_string(),
			});
		}
		accounts
	}

	/// Extract an `@len@`-framed binary field from the named segment.
	fn binary_payload(message: &str, name: &str) -> Option<String> {
		let segment = Self::find_segment(message, name)?;
		let at = segment.find("+@")?;
		let rest = &segment[at + 2..];
		let close = rest.find('@')?;
		let len: usize = rest[..close].parse().ok()?;
		let data = &rest[close + 1..];
		Some(data.get(..len).unwrap_or(data).to_string())
	}
}

#[async_trait::async_trait]
impl TransactionSource for FintsClient {
	async fn fetch_transactions(
		&mut self,
		start_date: NaiveDate,
	) -> Result<Vec<RawTransaction>, SourceError> {
		let account = self
			.account
			.clone()
			.ok_or_else(|| SourceError::DialogError("no account selected".to_string()))?;

		debug!(
			"Requesting statement for account {} since {}",
			account.iban, start_date
		);

		let segments = vec![
			self.signature_head(),
			format!(
				"HKKAZ:3:7+{}::280:{}+N+{}",
				account.account_number,
				self.config.bank_code,
				start_date.format("%Y%m%d")
			),
			self.signature_trailer(4, None),
		];

		let response = self.exchange(&segments).await?;
		self.check_return_codes(&response)?;

		let statement = Self::binary_payload(&response, "HIKAZ").unwrap_or_default();
		if statement.is_empty() {
			debug!("Bank returned no statement data");
			return Ok(Vec::new());
		}

		mt940::parse_statement(&statement)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client() -> FintsClient {
		FintsClient::new(FintsConfig {
			endpoint: "https://fints.example.test/fints/".to_string(),
			bank_code: "50010517".to_string(),
			login: "user1".to_string(),
			pin: "1234".to_string(),
			product_id: None,
		})
	}

	#[test]
	fn message_header_carries_the_final_length() {
		let client = client();
		let message = client.build_message(&["HKSPA:2:1+".to_string()]);

		assert!(message.starts_with("HNHBK:1:3+"));
		assert!(message.ends_with("HNHBS:3:1+1'"));
		let size: usize = message[10..22].parse().unwrap();
		assert_eq!(size, message.len());
	}

	#[test]
	fn return_code_9xxx_is_a_dialog_error() {
		let client = client();
		let message = "HNHBK:1:3+000000000123+300+ABC+1'HIRMG:2:2+9050::Nachricht teilweise fehlerhaft'";
		let err = client.check_return_codes(message).unwrap_err();
		assert!(err.to_string().contains("9050"));
		assert!(err.to_string().contains("Nachricht teilweise fehlerhaft"));

		let ok = "HNHBK:1:3+000000000123+300+ABC+1'HIRMG:2:2+0010::Nachricht entgegengenommen'";
		assert!(client.check_return_codes(ok).is_ok());
	}

	#[test]
	fn dialog_id_is_read_from_the_response_header() {
		let message = "HNHBK:1:3+000000000123+300+FD87341+2'HIRMG:2:2+0010::OK'";
		assert_eq!(
			FintsClient::header_field(message, 3),
			Some("FD87341".to_string())
		);
	}

	#[test]
	fn tan_challenge_is_extracted_when_present() {
		let message = "HITAN:5:6:4+4++4937569+Bitte bestaetigen Sie den Auftrag in Ihrer App'";
		assert_eq!(
			FintsClient::tan_challenge(message),
			Some("Bitte bestaetigen Sie den Auftrag in Ihrer App".to_string())
		);
		assert_eq!(FintsClient::tan_challenge("HIRMG:2:2+0010::OK'"), None);
	}

	#[test]
	fn sepa_accounts_are_parsed_from_hispa() {
		let segment = "HISPA:4:1:3+J:DE44500105175407324931:INGDDEFFXXX:5407324931:280:50010517+N::1234567:280:50010517";
		let accounts = FintsClient::parse_accounts(segment);
		assert_eq!(
			accounts,
			vec![SepaAccount {
				iban: "DE44500105175407324931".to_string(),
				account_number: "5407324931".to_string(),
			}]
		);
	}

	#[test]
	fn binary_payload_respects_the_length_frame() {
		let message = "HIKAZ:4:7:3+@19@:61:240102C1,00NTRF'HNHBS:5:1+2'";
		let payload = FintsClient::binary_payload(message, "HIKAZ").unwrap();
		assert_eq!(payload, ":61:240102C1,00NTRF");
	}
}
