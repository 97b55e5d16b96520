//! Common types shared by the readers and writers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents one statement transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Date the transaction was posted.
    pub date: NaiveDate,

    /// Free-text description (memo).
    pub description: String,

    /// Signed amount; negative values are debits.
    pub amount: Decimal,

    /// Source identifier, empty when the source has none.
    pub id: String,
}

impl TransactionRecord {
    /// Create a new record.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        id: impl Into<String>,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            id: id.into(),
        }
    }

    /// Whether the amount counts as a credit. Zero is a credit.
    pub fn is_credit(&self) -> bool {
        !self.amount.is_sign_negative() || self.amount.is_zero()
    }
}

/// Ordered records of one parsed statement or table.
pub type RecordSet = Vec<TransactionRecord>;

/// Earliest and latest record dates, or `None` for an empty set.
pub fn date_range(records: &[TransactionRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let first = records.first()?.date;
    Some(records.iter().fold((first, first), |(min, max), record| {
        (min.min(record.date), max.max(record.date))
    }))
}

/// Format an amount with exactly two decimal places, rounding half away from zero.
pub fn format_two_decimals(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}
