//! Cursor persistence for resumable synchronization.
//!
//! The cursor is the only durable state of the service: the date of the last
//! successful cycle and the identity of the first transaction of that
//! cycle's fetch. It is stored as a two-line text file (ISO-8601 date, hex
//! digest). A missing or unreadable file is not an error; the cycle falls
//! back to its configured start date.

use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use crate::sync::hasher::TransactionIdentity;
use crate::sync::SyncError;

/// The last successfully synchronized position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
	/// Wall-clock date of the cycle that wrote the cursor.
	pub date: NaiveDate,
	/// Identity of the first transaction of that cycle's full fetch.
	pub last_identity: TransactionIdentity,
}

/// Outcome of reading the persisted cursor.
///
/// Absence and unreadable content both make the cycle fall back to its
/// configured start date, but they stay distinguishable to callers.
#[derive(Debug)]
pub enum CursorLoad {
	/// No cursor has been persisted yet.
	Absent,
	/// A cursor file exists but does not parse; the reason is kept for logging.
	Malformed(String),
	Loaded(Cursor),
}

/// Capability for loading and saving the sync cursor.
#[async_trait::async_trait]
pub trait CursorStore: Send + Sync {
	async fn load(&self) -> Result<CursorLoad, SyncError>;
	async fn save(&self, cursor: &Cursor) -> Result<(), SyncError>;
}

/// File-based implementation of CursorStore
pub struct FileCursorStore {
	path: PathBuf,
}

impl FileCursorStore {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}

	fn parse(contents: &str) -> Result<Cursor, String> {
		let mut lines = contents.lines();
		let date_line = lines.next().ok_or("missing date line")?;
		let identity_line = lines.next().ok_or("missing identity line")?;

		let date = NaiveDate::parse_from_str(date_line.trim(), "%Y-%m-%d")
			.map_err(|e| format!("bad date {:?}: {}", date_line, e))?;
		let last_identity = TransactionIdentity::from_hex(identity_line)
			.ok_or_else(|| format!("bad identity digest {:?}", identity_line))?;

		Ok(Cursor {
			date,
			last_identity,
		})
	}
}

#[async_trait::async_trait]
impl CursorStore for FileCursorStore {
	async fn load(&self) -> Result<CursorLoad, SyncError> {
		let contents = match tokio::fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CursorLoad::Absent),
			Err(e) => return Err(SyncError::IoError(e)),
		};

		match Self::parse(&contents) {
			Ok(cursor) => Ok(CursorLoad::Loaded(cursor)),
			Err(reason) => Ok(CursorLoad::Malformed(reason)),
		}
	}

	async fn save(&self, cursor: &Cursor) -> Result<(), SyncError> {
		let contents = format!(
			"{}\n{}",
			cursor.date.format("%Y-%m-%d"),
			cursor.last_identity
		);

		// New-then-rename keeps the previous cursor intact if the process
		// dies mid-write.
		let tmp = self.path.with_extension("tmp");
		tokio::fs::write(&tmp, &contents).await?;
		tokio::fs::rename(&tmp, &self.path).await?;

		info!("Saved sync cursor to {:?} at date {}", self.path, cursor.date);
		Ok(())
	}
}

/// In-memory store for tests.
#[cfg(test)]
pub(crate) struct MemoryCursorStore(pub(crate) std::sync::Mutex<Option<Cursor>>);

#[cfg(test)]
impl MemoryCursorStore {
	pub(crate) fn empty() -> Self {
		Self(std::sync::Mutex::new(None))
	}

	pub(crate) fn with(cursor: Cursor) -> Self {
		Self(std::sync::Mutex::new(Some(cursor)))
	}

	pub(crate) fn current(&self) -> Option<Cursor> {
		self.0.lock().unwrap().clone()
	}
}

#[cfg(test)]
#[async_trait::async_trait]
impl CursorStore for MemoryCursorStore {
	async fn load(&self) -> Result<CursorLoad, SyncError> {
		Ok(match self.current() {
			Some(cursor) => CursorLoad::Loaded(cursor),
			None => CursorLoad::Absent,
		})
	}

	async fn save(&self, cursor: &Cursor) -> Result<(), SyncError> {
		*self.0.lock().unwrap() = Some(cursor.clone());
		Ok(())
	}
}
