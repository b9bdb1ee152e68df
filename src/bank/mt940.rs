//! MT940 statement parsing.
//!
//! The FinTS statement response (HIKAZ) carries the booked transactions as an
//! MT940 text blob. Only the tags the sync needs are handled: `:61:` entry
//! lines for booking date and amount, and the structured `:86:` information
//! field for the applicant name and purpose. Everything else (balances,
//! statement references) is skipped.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use super::types::{RawTransaction, SourceError};

// :61: YYMMDD [MMDD] [R]C/D [funds code]? amount[,~~] ...
const ENTRY_PATTERN: &str =
    r"^:61:(?P<val>\d{6})(?P<book>\d{4})?(?P<dc>R?[CD])(?P<fc>[A-Z])?(?P<amt>\d+,\d{0,2})";

/// Parse the booked entries of an MT940 statement, in statement order.
pub fn parse_statement(statement: &str) -> Result<Vec<RawTransaction>, SourceError> {
    let re_entry =
        Regex::new(ENTRY_PATTERN).map_err(|e| SourceError::ParseError(e.to_string()))?;

    let mut transactions: Vec<RawTransaction> = Vec::new();
    let mut in_information = false;

    for line in statement.lines() {
        if let Some(caps) = re_entry.captures(line) {
            let date = parse_mt_date(&caps["val"])?;
            let sign = match &caps["dc"] {
                "C" | "RD" => Decimal::ONE,
                "D" | "RC" => Decimal::NEGATIVE_ONE,
                other => {
                    return Err(SourceError::ParseError(format!(
                        ":61: unknown debit/credit mark {other}"
                    )));
                }
            };
            let amount: Decimal = caps["amt"]
                .replace(',', ".")
                .parse()
                .map_err(|e| SourceError::ParseError(format!(":61: amount: {e}")))?;

            transactions.push(RawTransaction {
                date,
                applicant_name: String::new(),
                purpose: String::new(),
                amount: sign * amount,
            });
            in_information = false;
        } else if let Some(information) = line.strip_prefix(":86:") {
            if let Some(last) = transactions.last_mut() {
                apply_information(last, information);
            }
            in_information = true;
        } else if in_information && !line.starts_with(':') {
            // Wrapped :86: content continues on unprefixed lines.
            if let Some(last) = transactions.last_mut() {
                apply_information(last, line.trim_end());
            }
        } else {
            in_information = false;
        }
    }

    Ok(transactions)
}

/// Merge one line of structured `:86:` content into the entry.
///
/// The field is `?`-delimited: a leading transaction code, then two-digit
/// subfield tags. Tags 20 through 29 hold the purpose (27-character chunks
/// meant to be concatenated as-is), tags 32 and 33 the applicant name.
fn apply_information(tx: &mut RawTransaction, information: &str) {
    for subfield in information.split('?').skip(1) {
        if subfield.len() < 2 {
            continue;
        }
        let (tag, content) = subfield.split_at(2);
        match tag {
            "20" | "21" | "22" | "23" | "24" | "25" | "26" | "27" | "28" | "29" => {
                tx.purpose.push_str(content);
            }
            "32" | "33" => {
                tx.applicant_name.push_str(content);
            }
            _ => {}
        }
    }
}

fn parse_mt_date(yymmdd: &str) -> Result<NaiveDate, SourceError> {
    NaiveDate::parse_from_str(yymmdd, "%y%m%d").map_err(|e| SourceError::ParseError(e.to_string()))
}
