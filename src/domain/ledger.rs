//! Append-only transaction ledger and the cost-basis aggregates derived from it.
//!
//! A *holding period* starts at the beginning of the ledger or right after a
//! sell that liquidated the position. Average cost is scoped to the current
//! period; lifetime totals never reset.

use std::str::FromStr;

use super::precision::{clamp_units, is_effectively_zero, safe_divide};
use super::transaction::{Transaction, TransactionKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    pub fn from_transactions(entries: Vec<Transaction>) -> Self {
        Ledger { entries }
    }

    pub fn append(&mut self, transaction: Transaction) {
        self.entries.push(transaction);
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unit balance obtained by replaying every entry, with liquidation
    /// residue snapped to zero after each sell.
    pub fn replay_units(&self) -> f64 {
        self.entries.iter().fold(0.0, |units, t| {
            let next = units + t.signed_units();
            if t.is_sell() { clamp_units(next) } else { next }
        })
    }
}

/// Totals over the whole ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LifetimeSummary {
    pub total_buy_amount: f64,
    pub total_sell_amount: f64,
    pub total_buy_units: f64,
    pub total_sell_units: f64,
    /// Sell proceeds minus sold units valued at the lifetime average buy price.
    pub realized_profit: f64,
}

impl LifetimeSummary {
    pub fn has_buys(&self) -> bool {
        self.total_buy_amount > 0.0
    }

    pub fn average_buy_price(&self) -> f64 {
        safe_divide(self.total_buy_amount, self.total_buy_units)
    }
}

/// Totals over the current holding period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodSummary {
    pub buy_amount: f64,
    pub buy_units: f64,
    pub sell_amount: f64,
    pub sell_units: f64,
}

/// How the average cost of the held units is derived from a [`PeriodSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CostBasisMethod {
    /// Period buy amount over period buy units. Sells do not move the cost.
    #[default]
    WeightedAverage,
    /// Net cash put into the period over the units still held. Profitable
    /// partial sells lower the cost, losing ones raise it.
    NetInvestment,
}

impl FromStr for CostBasisMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weighted_average" | "weighted-average" => Ok(CostBasisMethod::WeightedAverage),
            "net_investment" | "net-investment" => Ok(CostBasisMethod::NetInvestment),
            other => Err(format!("unknown cost basis method '{other}'")),
        }
    }
}

impl PeriodSummary {
    /// Average cost per held unit; zero when nothing is held. A small but
    /// open position keeps its cost: only a sell snaps holdings to zero.
    pub fn average_cost(&self, method: CostBasisMethod, held_units: f64) -> f64 {
        if held_units <= 0.0 {
            return 0.0;
        }
        match method {
            CostBasisMethod::WeightedAverage => safe_divide(self.buy_amount, self.buy_units),
            CostBasisMethod::NetInvestment => {
                let net = self.buy_amount - self.sell_amount;
                if net > 0.0 { net / held_units } else { 0.0 }
            }
        }
    }
}

pub fn summarize_lifetime(ledger: &[Transaction]) -> LifetimeSummary {
    let mut summary = LifetimeSummary::default();
    for t in ledger {
        match t.kind {
            TransactionKind::Buy => {
                summary.total_buy_amount += t.amount;
                summary.total_buy_units += t.units;
            }
            TransactionKind::Sell => {
                summary.total_sell_amount += t.amount;
                summary.total_sell_units += t.units;
            }
        }
    }
    if summary.has_buys() && summary.total_sell_units > 0.0 {
        summary.realized_profit =
            summary.total_sell_amount - summary.total_sell_units * summary.average_buy_price();
    }
    summary
}

/// Index of the first entry after the most recent full liquidation, or 0.
pub fn find_current_period_start(ledger: &[Transaction]) -> usize {
    let mut simulated_units = 0.0;
    let mut start = 0;
    for (i, t) in ledger.iter().enumerate() {
        match t.kind {
            TransactionKind::Buy => simulated_units += t.units,
            TransactionKind::Sell => {
                simulated_units -= t.units;
                if is_effectively_zero(simulated_units) {
                    simulated_units = 0.0;
                    start = i + 1;
                }
            }
        }
    }
    start
}

pub fn summarize_period(ledger: &[Transaction], period_start: usize) -> PeriodSummary {
    let mut summary = PeriodSummary::default();
    for t in ledger.iter().skip(period_start) {
        match t.kind {
            TransactionKind::Buy => {
                summary.buy_amount += t.amount;
                summary.buy_units += t.units;
            }
            TransactionKind::Sell => {
                summary.sell_amount += t.amount;
                summary.sell_units += t.units;
            }
        }
    }
    summary
}

/// Period summary for the holding period that is open at the end of the ledger.
pub fn summarize_current_period(ledger: &[Transaction]) -> PeriodSummary {
    summarize_period(ledger, find_current_period_start(ledger))
}
