//! Scheduled sync driver.
//!
//! Runs one sync cycle per interval until asked to stop. The wait between
//! cycles is cancellable: a shutdown signal observed while sleeping ends the
//! loop without starting another cycle. A cycle that has already started
//! always runs to completion or failure.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::sync::{CycleOutcome, SyncCycle};

/// Drives repeated sync cycles at a fixed interval.
pub struct SyncDriver {
	interval: Duration,
}

impl SyncDriver {
	pub fn new(interval: Duration) -> Self {
		Self { interval }
	}

	/// Run cycles until `shutdown` resolves.
	///
	/// Cycle failures are logged and the next tick retries the same
	/// unconsumed range; the cursor only moves after a successful cycle.
	pub async fn run(&self, cycle: &mut SyncCycle, shutdown: impl Future<Output = ()>) {
		tokio::pin!(shutdown);

		loop {
			match cycle.run().await {
				Ok(CycleOutcome::NothingNew) => info!("No new transactions found"),
				Ok(CycleOutcome::Imported(count)) => {
					info!("Imported {} new transaction(s)", count)
				}
				Ok(CycleOutcome::Inspected(count)) => {
					info!("Inspected {} transaction(s) without submitting", count)
				}
				Err(e) => error!("Sync cycle failed, will retry next interval: {}", e),
			}

			info!("Sleeping for {} seconds", self.interval.as_secs());
			tokio::select! {
				_ = tokio::time::sleep(self.interval) => {}
				_ = &mut shutdown => {
					info!("Shutdown requested, stopping sync driver");
					break;
				}
			}
		}
	}
}
