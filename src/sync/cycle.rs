//! The sync cycle, the unit of atomicity for retries.
//!
//! One cycle walks fetch -> resume-point resolution -> transform -> submit
//! (or inspect) -> cursor persistence. The injected capabilities make the
//! cycle testable with in-memory fakes:
//!
//! - `TransactionSource` fetches booked transactions from the bank.
//! - `RecordSink` submits normalized records to YNAB.
//! - `CursorStore` loads and saves the resume position.
//!
//! Any source or sink failure aborts the cycle before the cursor is written,
//! so the next cycle retries the same unconsumed range from scratch.

use chrono::Local;
use tracing::{info, warn};

use crate::bank::TransactionSource;
use crate::sync::cursor::{Cursor, CursorLoad, CursorStore};
use crate::sync::dedup::resume_index;
use crate::sync::hasher::identity;
use crate::sync::transform::transform;
use crate::sync::SyncError;
use crate::ynab::RecordSink;

/// Per-cycle configuration, plain values handed in by the bootstrap.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// YNAB account the records are created in.
    pub account_id: String,
    /// Fallback start date when no cursor has been persisted yet.
    pub start_date: Option<chrono::NaiveDate>,
    /// Surface records instead of submitting them.
    pub inspect: bool,
}

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The fetch contained nothing beyond the stored cursor; the cycle had
    /// no side effects at all.
    NothingNew,
    /// Records were submitted to YNAB; carries the number of created
    /// transaction ids.
    Imported(usize),
    /// Inspection mode: records were surfaced instead of submitted.
    Inspected(usize),
}

/// One full synchronization pass, coordinating the injected capabilities.
pub struct SyncCycle {
    source: Box<dyn TransactionSource>,
    sink: Box<dyn RecordSink>,
    store: Box<dyn CursorStore>,
    config: CycleConfig,
}

impl SyncCycle {
    pub fn new(
        source: Box<dyn TransactionSource>,
        sink: Box<dyn RecordSink>,
        store: Box<dyn CursorStore>,
        config: CycleConfig,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            config,
        }
    }

    /// Run one cycle.
    pub async fn run(&mut self) -> Result<CycleOutcome, SyncError> {
        let cursor = match self.store.load().await? {
            CursorLoad::Loaded(cursor) => Some(cursor),
            CursorLoad::Absent => None,
            CursorLoad::Malformed(reason) => {
                warn!("Ignoring unreadable cursor state: {}", reason);
                None
            }
        };

        let start_date = cursor
            .as_ref()
            .map(|c| c.date)
            .or(self.config.start_date)
            .unwrap_or_else(|| Local::now().date_naive());

        let fetched = self.source.fetch_transactions(start_date).await?;
        info!(
            "Fetched {} transaction(s) booked since {}",
            fetched.len(),
            start_date
        );

        let start = resume_index(&fetched, cursor.as_ref().map(|c| &c.last_identity));
        if cursor.is_some() && start == 0 && !fetched.is_empty() {
            warn!(
                "Stored transaction identity not found in the fetched range; \
                 reprocessing all {} transaction(s), duplicates may be submitted",
                fetched.len()
            );
        }

        let fresh = &fetched[start..];
        if fresh.is_empty() {
            return Ok(CycleOutcome::NothingNew);
        }

        let records = transform(fresh, &self.config.account_id);

        let outcome = if self.config.inspect {
            for record in &records {
                info!("Would import: {:?}", record);
            }
            CycleOutcome::Inspected(records.len())
        } else {
            let created = self.sink.submit(&records).await?;
            CycleOutcome::Imported(created.len())
        };

        // The new cursor pairs today's date with the identity of the FIRST
        // element of the unsliced fetch; existing state files rely on
        // exactly this anchor scheme.
        let next = Cursor {
            date: Local::now().date_naive(),
            last_identity: identity(&fetched[0]),
        };
        self.store.save(&next).await?;

        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use crate::bank::{RawTransaction, SourceError, TransactionSource};
    use crate::ynab::{RecordSink, YnabError, YnabTransaction};

    /// Source fake returning a fixed list, or failing on demand. The start
    /// dates it was asked for stay observable through the shared handle.
    pub(crate) struct FakeSource {
        pub(crate) transactions: Vec<RawTransaction>,
        pub(crate) fail: bool,
        pub(crate) seen_start_dates: Arc<Mutex<Vec<NaiveDate>>>,
    }

    impl FakeSource {
        pub(crate) fn with(transactions: Vec<RawTransaction>) -> Self {
            Self {
                transactions,
                fail: false,
                seen_start_dates: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl TransactionSource for FakeSource {
        async fn fetch_transactions(
            &mut self,
            start_date: NaiveDate,
        ) -> Result<Vec<RawTransaction>, SourceError> {
            if self.fail {
                return Err(SourceError::DialogError("fetch failed".to_string()));
            }
            self.seen_start_dates.lock().unwrap().push(start_date);
            Ok(self.transactions.clone())
        }
    }

    /// Sink fake recording every submitted batch.
    #[derive(Default)]
    pub(crate) struct FakeSink {
        pub(crate) submitted: Mutex<Vec<Vec<YnabTransaction>>>,
        pub(crate) fail: bool,
    }

    impl FakeSink {
        pub(crate) fn batches(&self) -> Vec<Vec<YnabTransaction>> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RecordSink for FakeSink {
        async fn submit(&self, records: &[YnabTransaction]) -> Result<Vec<String>, YnabError> {
            if self.fail {
                return Err(YnabError::ApiError {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "submit failed".to_string(),
                });
            }
            self.submitted.lock().unwrap().push(records.to_vec());
            Ok(records.iter().map(|r| format!("id-{}", r.amount)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{FakeSink, FakeSource};
    use super::*;
    use crate::bank::RawTransaction;
    use crate::sync::cursor::MemoryCursorStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn tx(day: u32, purpose: &str) -> RawTransaction {
        RawTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            applicant_name: "ACME GmbH".to_string(),
            purpose: purpose.to_string(),
            amount: "10.00".parse().unwrap(),
        }
    }

    fn config() -> CycleConfig {
        CycleConfig {
            account_id: "acct-1".to_string(),
            start_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            inspect: false,
        }
    }

    struct SharedStore(Arc<MemoryCursorStore>);

    #[async_trait::async_trait]
    impl crate::sync::cursor::CursorStore for SharedStore {
        async fn load(&self) -> Result<CursorLoad, SyncError> {
            self.0.load().await
        }
        async fn save(&self, cursor: &Cursor) -> Result<(), SyncError> {
            self.0.save(cursor).await
        }
    }

    struct SharedSink(Arc<FakeSink>);

    #[async_trait::async_trait]
    impl RecordSink for SharedSink {
        async fn submit(
            &self,
            records: &[crate::ynab::YnabTransaction],
        ) -> Result<Vec<String>, crate::ynab::YnabError> {
            self.0.submit(records).await
        }
    }

    fn make_cycle(
        source: FakeSource,
        sink: Arc<FakeSink>,
        store: Arc<MemoryCursorStore>,
        config: CycleConfig,
    ) -> SyncCycle {
        SyncCycle::new(
            Box::new(source),
            Box::new(SharedSink(sink)),
            Box::new(SharedStore(store)),
            config,
        )
    }

    #[tokio::test]
    async fn resumes_after_the_stored_identity_and_reanchors_on_the_first_fetched() {
        let fetched = vec![tx(1, "x"), tx(2, "y"), tx(3, "z")];
        let store = Arc::new(MemoryCursorStore::with(Cursor {
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            last_identity: identity(&fetched[0]),
        }));
        let sink = Arc::new(FakeSink::default());
        let mut cycle = make_cycle(FakeSource::with(fetched.clone()), sink.clone(), store.clone(), config());

        let outcome = cycle.run().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Imported(2));
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0].memo, "y");
        assert_eq!(batches[0][1].memo, "z");

        let cursor = store.current().unwrap();
        assert_eq!(cursor.last_identity, identity(&fetched[0]));
        assert_eq!(cursor.date, Local::now().date_naive());
    }

    #[tokio::test]
    async fn nothing_new_has_no_side_effects() {
        let fetched = vec![tx(1, "x"), tx(2, "y")];
        let stored = Cursor {
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            last_identity: identity(&fetched[1]),
        };
        let store = Arc::new(MemoryCursorStore::with(stored.clone()));
        let sink = Arc::new(FakeSink::default());
        let mut cycle = make_cycle(FakeSource::with(fetched), sink.clone(), store.clone(), config());

        let outcome = cycle.run().await.unwrap();

        assert_eq!(outcome, CycleOutcome::NothingNew);
        assert!(sink.batches().is_empty());
        assert_eq!(store.current().unwrap(), stored);
    }

    #[tokio::test]
    async fn an_empty_cycle_leaves_the_cursor_file_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let fetched = vec![tx(1, "x")];

        let store = crate::sync::cursor::FileCursorStore::new(path.clone());
        store
            .save(&Cursor {
                date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                last_identity: identity(&fetched[0]),
            })
            .await
            .unwrap();
        let before = tokio::fs::read(&path).await.unwrap();

        let sink = Arc::new(FakeSink::default());
        let mut cycle = SyncCycle::new(
            Box::new(FakeSource::with(fetched)),
            Box::new(SharedSink(sink.clone())),
            Box::new(store),
            config(),
        );

        assert_eq!(cycle.run().await.unwrap(), CycleOutcome::NothingNew);
        assert!(sink.batches().is_empty());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), before);
    }

    #[tokio::test]
    async fn without_a_cursor_the_whole_fetch_is_imported() {
        let store = Arc::new(MemoryCursorStore::empty());
        let sink = Arc::new(FakeSink::default());
        let source = FakeSource::with(vec![tx(1, "x"), tx(2, "y")]);
        let mut cycle = make_cycle(source, sink.clone(), store.clone(), config());

        let outcome = cycle.run().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Imported(2));
        assert!(store.current().is_some());
    }

    #[tokio::test]
    async fn an_aged_out_identity_reprocesses_the_full_range() {
        let fetched = vec![tx(1, "x"), tx(2, "y")];
        let store = Arc::new(MemoryCursorStore::with(Cursor {
            date: NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            last_identity: identity(&tx(9, "aged out")),
        }));
        let sink = Arc::new(FakeSink::default());
        let mut cycle = make_cycle(FakeSource::with(fetched), sink.clone(), store.clone(), config());

        let outcome = cycle.run().await.unwrap();

        // Known duplicate-risk condition: everything is submitted again.
        assert_eq!(outcome, CycleOutcome::Imported(2));
    }

    #[tokio::test]
    async fn the_cursor_date_wins_over_the_configured_start_date() {
        let cursor_date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let fetched = vec![tx(1, "x")];
        let store = Arc::new(MemoryCursorStore::with(Cursor {
            date: cursor_date,
            last_identity: identity(&fetched[0]),
        }));
        let sink = Arc::new(FakeSink::default());
        let source = FakeSource::with(fetched);
        let seen = source.seen_start_dates.clone();
        let mut cycle = make_cycle(source, sink, store, config());

        cycle.run().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![cursor_date]);
    }

    #[tokio::test]
    async fn without_any_state_the_configured_start_date_is_used() {
        let store = Arc::new(MemoryCursorStore::empty());
        let sink = Arc::new(FakeSink::default());
        let source = FakeSource::with(Vec::new());
        let seen = source.seen_start_dates.clone();
        let mut cycle = make_cycle(source, sink, store, config());

        let outcome = cycle.run().await.unwrap();

        assert_eq!(outcome, CycleOutcome::NothingNew);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()]
        );
    }

    #[tokio::test]
    async fn a_failing_submit_leaves_the_cursor_unchanged() {
        let store = Arc::new(MemoryCursorStore::empty());
        let sink = Arc::new(FakeSink {
            fail: true,
            ..FakeSink::default()
        });
        let source = FakeSource::with(vec![tx(1, "x")]);
        let mut cycle = make_cycle(source, sink, store.clone(), config());

        assert!(cycle.run().await.is_err());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn a_failing_fetch_leaves_the_cursor_unchanged() {
        let store = Arc::new(MemoryCursorStore::empty());
        let sink = Arc::new(FakeSink::default());
        let source = FakeSource {
            fail: true,
            ..FakeSource::with(Vec::new())
        };
        let mut cycle = make_cycle(source, sink, store.clone(), config());

        assert!(cycle.run().await.is_err());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn inspect_mode_submits_nothing_but_still_persists_the_cursor() {
        let store = Arc::new(MemoryCursorStore::empty());
        let sink = Arc::new(FakeSink::default());
        let source = FakeSource::with(vec![tx(1, "x")]);
        let mut inspect_config = config();
        inspect_config.inspect = true;
        let mut cycle = make_cycle(source, sink.clone(), store.clone(), inspect_config);

        let outcome = cycle.run().await.unwrap();

        assert_eq!(outcome, CycleOutcome::Inspected(1));
        assert!(sink.batches().is_empty());
        assert!(store.current().is_some());
    }
}
