//! Ledger entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
        }
    }
}

/// One executed trade. `amount == units * price` at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub kind: TransactionKind,
    pub amount: f64,
    pub units: f64,
    pub price: f64,
    pub day_index: usize,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Transaction {
    pub fn is_sell(&self) -> bool {
        self.kind == TransactionKind::Sell
    }

    /// Units added to (buy) or removed from (sell) the holding.
    pub fn signed_units(&self) -> f64 {
        match self.kind {
            TransactionKind::Buy => self.units,
            TransactionKind::Sell => -self.units,
        }
    }
}
