//! Transaction identity hashing.
//!
//! Derives a stable fingerprint for a bank transaction from its semantic
//! fields. The fingerprint is the dedup key for resumable sync: it uses no
//! identifier from the bank side, only the field values themselves, so two
//! fetches of the same booking always agree on its identity.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::bank::RawTransaction;

/// SHA-256 fingerprint of a transaction's semantic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionIdentity([u8; 32]);

impl TransactionIdentity {
    /// Parse a hex-encoded identity, as stored in the cursor file.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim()).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for TransactionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Compute the identity of a transaction.
///
/// The fields are serialized in the fixed order date, applicant, purpose,
/// amount, joined with colons. The delimiter is not escaped inside the
/// fields; a field containing a colon can in principle collide with another
/// field split.
pub fn identity(tx: &RawTransaction) -> TransactionIdentity {
    let payload = format!(
        "{}:{}:{}:{}",
        tx.date.format("%Y-%m-%d"),
        tx.applicant_name,
        tx.purpose,
        tx.amount,
    );

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    TransactionIdentity(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn transaction() -> RawTransaction {
        RawTransaction {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            applicant_name: "ACME GmbH".to_string(),
            purpose: "Gehalt 01/2024".to_string(),
            amount: "1250.00".parse::<Decimal>().unwrap(),
        }
    }

    #[test]
    fn identity_is_deterministic() {
        assert_eq!(identity(&transaction()), identity(&transaction()));
    }

    #[test]
    fn any_field_change_changes_the_identity() {
        let base = transaction();

        let mut other = transaction();
        other.date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_ne!(identity(&base), identity(&other));

        let mut other = transaction();
        other.applicant_name.push('!');
        assert_ne!(identity(&base), identity(&other));

        let mut other = transaction();
        other.purpose.push('!');
        assert_ne!(identity(&base), identity(&other));

        let mut other = transaction();
        other.amount = "1250.01".parse().unwrap();
        assert_ne!(identity(&base), identity(&other));
    }

    #[test]
    fn hex_form_round_trips() {
        let id = identity(&transaction());
        let parsed = TransactionIdentity::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(TransactionIdentity::from_hex("not hex").is_none());
        assert!(TransactionIdentity::from_hex("abcd").is_none());
    }
}
