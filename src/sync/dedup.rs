//! Resume-point resolution against the stored cursor.

use crate::bank::RawTransaction;
use crate::sync::hasher::{identity, TransactionIdentity};

/// Find the index from which the fetched transactions are new.
///
/// Scans the whole sequence; every entry matching `last_identity` moves the
/// candidate to the position after it, so when a booking repeats the last
/// occurrence wins. No stored identity, or an identity that is no longer
/// inside the fetched range, resolves to 0 and the full range is treated as
/// new.
pub fn resume_index(
    transactions: &[RawTransaction],
    last_identity: Option<&TransactionIdentity>,
) -> usize {
    let Some(last) = last_identity else {
        return 0;
    };

    let mut start = 0;
    for (i, tx) in transactions.iter().enumerate() {
        if identity(tx) == *last {
            start = i + 1;
        }
    }
    start
}
