//! Persisted game document: the externally relevant subset of engine state.

use serde::{Deserialize, Serialize};

use super::error::FundsimError;
use super::precision::UNIT_EPSILON;
use super::price_series::PriceSeries;
use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    pub current_index: usize,
    pub initial_index: usize,
    pub cash: f64,
    pub units: f64,
    pub total_assets: f64,
    pub cumulative_profit_rate: f64,
    #[serde(default)]
    pub realized_profit: f64,
    #[serde(default)]
    pub ledger: Vec<Transaction>,
    /// Milliseconds since the Unix epoch at the time the document was built.
    #[serde(default)]
    pub saved_at: i64,
}

impl GameDocument {
    /// Reject documents the engine cannot resume from.
    pub fn validate(&self, prices: &PriceSeries) -> Result<(), FundsimError> {
        if !self.cash.is_finite() || self.cash < 0.0 {
            return Err(invalid(format!("cash must be non-negative, got {}", self.cash)));
        }
        if !self.units.is_finite() || self.units < 0.0 {
            return Err(invalid(format!("units must be non-negative, got {}", self.units)));
        }
        if self.current_index >= prices.len() {
            return Err(invalid(format!(
                "current index {} outside price series of {} days",
                self.current_index,
                prices.len()
            )));
        }
        if self.initial_index > self.current_index {
            return Err(invalid(format!(
                "initial index {} is after current index {}",
                self.initial_index, self.current_index
            )));
        }
        if let Some(bad) = self
            .ledger
            .iter()
            .find(|t| !(t.units.is_finite() && t.units >= 0.0 && t.amount.is_finite()))
        {
            return Err(invalid(format!(
                "ledger entry at day {} has invalid units or amount",
                bad.day_index
            )));
        }
        Ok(())
    }

    /// True when the stored unit balance disagrees with a ledger replay.
    pub fn units_disagree_with(&self, replayed_units: f64) -> bool {
        (self.units - replayed_units).abs() >= UNIT_EPSILON
    }
}

fn invalid(reason: String) -> FundsimError {
    FundsimError::InvalidDocument { reason }
}
