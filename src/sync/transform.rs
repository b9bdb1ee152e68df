//! Transformation of bank transactions into YNAB records.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::bank::RawTransaction;
use crate::ynab::YnabTransaction;

/// Convert an exact decimal currency amount into YNAB milliunits.
///
/// Multiplies by 1000 and truncates toward zero; the remainder below a
/// milliunit is dropped, never rounded. All arithmetic stays in `Decimal`.
fn to_milliunits(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_THOUSAND)
        .trunc()
        .to_i64()
        .expect("amount exceeds the milliunit range")
}

/// Map fetched transactions onto YNAB's record shape, order preserved,
/// one record per transaction.
pub fn transform(transactions: &[RawTransaction], account_id: &str) -> Vec<YnabTransaction> {
    transactions
        .iter()
        .map(|tx| YnabTransaction {
            account_id: account_id.to_string(),
            date: tx.date.format("%Y-%m-%d").to_string(),
            amount: to_milliunits(tx.amount),
            payee_name: tx.applicant_name.clone(),
            memo: tx.purpose.clone(),
            cleared: "cleared".to_string(),
        })
        .collect()
}
