//! Portfolio accounting engine.
//!
//! Owns cash, units, the current day and the ledger for one session. Every
//! mutation appends to the ledger or moves the day, then recomputes all
//! derived metrics from scratch and bumps the revision so the sync
//! coordinator knows a push is due.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::document::GameDocument;
use super::error::FundsimError;
use super::ledger::{summarize_current_period, summarize_lifetime, CostBasisMethod, Ledger};
use super::precision::{clamp_units, safe_divide};
use super::price_series::PriceSeries;
use super::transaction::{Transaction, TransactionKind};

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_INITIAL_INDEX: usize = 29;
pub const DEFAULT_TOTAL_TRADING_DAYS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_cash: f64,
    pub initial_index: usize,
    pub total_trading_days: usize,
    pub cost_basis: CostBasisMethod,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            initial_index: DEFAULT_INITIAL_INDEX,
            total_trading_days: DEFAULT_TOTAL_TRADING_DAYS,
            cost_basis: CostBasisMethod::WeightedAverage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub units: f64,
    pub current_day_index: usize,
    pub initial_day_index: usize,
}

/// Values recomputed from state, ledger and prices; never stored on their own.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    pub current_net_value: f64,
    pub daily_change_pct: f64,
    pub holding_value: f64,
    pub total_assets: f64,
    pub avg_cost: f64,
    pub holding_profit: f64,
    pub realized_profit: f64,
    pub total_profit: f64,
    /// Percent return of the held units over their cost.
    pub profit_rate: f64,
    /// Percent return of the whole session.
    pub cumulative_profit_rate: f64,
    pub daily_profit: f64,
    pub period_invested: f64,
    pub period_sold: f64,
    pub lifetime_invested: f64,
    pub lifetime_sold: f64,
}

/// Read-only view of the engine handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSnapshot {
    pub state: PortfolioState,
    pub metrics: DerivedMetrics,
    pub current_date: Option<NaiveDate>,
    pub last_day_index: usize,
    pub remaining_days: usize,
    pub is_finished: bool,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeResult {
    pub transaction: Transaction,
    pub cash: f64,
    pub units: f64,
    pub total_assets: f64,
    /// Gain of a sell against the period cost held before it. `None` for buys.
    pub realized_gain: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    pub day_index: usize,
    pub date: Option<NaiveDate>,
    pub total_assets: f64,
    pub daily_change_pct: f64,
    pub daily_profit: f64,
    pub is_finished: bool,
}

#[derive(Debug, Clone)]
pub struct AccountingEngine {
    config: EngineConfig,
    prices: PriceSeries,
    state: PortfolioState,
    ledger: Ledger,
    metrics: DerivedMetrics,
    last_day_index: usize,
    revision: u64,
}

impl AccountingEngine {
    /// Start a fresh session at `config.initial_index`.
    pub fn new(prices: PriceSeries, config: EngineConfig) -> Result<Self, FundsimError> {
        let last = prices.last_index().ok_or_else(|| FundsimError::PriceData {
            reason: "price series is empty".into(),
        })?;
        if config.initial_index > last {
            return Err(FundsimError::PriceData {
                reason: format!(
                    "initial index {} outside price series of {} days",
                    config.initial_index,
                    prices.len()
                ),
            });
        }
        let state = initial_state(&config);
        let mut engine = AccountingEngine {
            last_day_index: horizon(&config, state.initial_day_index, last),
            config,
            prices,
            state,
            ledger: Ledger::new(),
            metrics: DerivedMetrics::default(),
            revision: 0,
        };
        engine.recompute_all();
        engine.mark_dirty();
        Ok(engine)
    }

    /// Start a session, resuming from `restore` when one is given.
    pub fn initialize(
        prices: PriceSeries,
        config: EngineConfig,
        restore: Option<GameDocument>,
    ) -> Result<Self, FundsimError> {
        let mut engine = AccountingEngine::new(prices, config)?;
        if let Some(document) = restore {
            engine.restore(document)?;
        }
        Ok(engine)
    }

    fn restore(&mut self, mut document: GameDocument) -> Result<(), FundsimError> {
        document.validate(&self.prices)?;

        let ledger = Ledger::from_transactions(std::mem::take(&mut document.ledger));
        let replayed = ledger.replay_units();
        let units = if document.units_disagree_with(replayed) {
            warn!(
                stored = document.units,
                replayed, "saved units disagree with ledger, using ledger"
            );
            replayed
        } else {
            clamp_units(document.units)
        };

        self.state = PortfolioState {
            cash: document.cash,
            units,
            current_day_index: document.current_index,
            initial_day_index: document.initial_index,
        };
        self.ledger = ledger;
        self.last_day_index = horizon(
            &self.config,
            document.initial_index,
            self.prices.last_index().unwrap_or(0),
        );
        self.recompute_all();
        self.mark_dirty();
        info!(
            day = self.state.current_day_index,
            transactions = self.ledger.len(),
            "restored saved game"
        );
        Ok(())
    }

    /// Buy fund units for `amount` of cash at the current day's net value.
    ///
    /// Fails without touching any state when the amount is not a positive
    /// number, exceeds available cash, or the day has no valid price.
    pub fn buy(&mut self, amount: f64) -> Result<TradeResult, FundsimError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(FundsimError::InvalidAmount { value: amount });
        }
        if amount > self.state.cash {
            return Err(FundsimError::InsufficientFunds {
                requested: amount,
                available: self.state.cash,
            });
        }
        let price = self.trade_price()?;
        let units = amount / price;

        let transaction = self.record(TransactionKind::Buy, amount, units, price);
        self.state.cash -= amount;
        self.state.units += units;
        self.after_mutation();

        debug!(amount, units, price, "buy executed");
        Ok(self.trade_result(transaction, None))
    }

    /// Sell `units` at the current day's net value.
    ///
    /// The realized gain reported for this sale uses the period cost basis in
    /// effect before the sale.
    pub fn sell(&mut self, units: f64) -> Result<TradeResult, FundsimError> {
        if !units.is_finite() || units <= 0.0 {
            return Err(FundsimError::InvalidAmount { value: units });
        }
        if units > self.state.units {
            return Err(FundsimError::InsufficientUnits {
                requested: units,
                held: self.state.units,
            });
        }
        let price = self.trade_price()?;
        let amount = units * price;
        let realized_gain = units * (price - self.period_average_cost());

        let transaction = self.record(TransactionKind::Sell, amount, units, price);
        self.state.cash += amount;
        self.state.units = clamp_units(self.state.units - units);
        self.after_mutation();

        debug!(amount, units, price, realized_gain, "sell executed");
        Ok(self.trade_result(transaction, Some(realized_gain)))
    }

    /// Move to the next trading day. Persistence is left to the caller.
    pub fn advance_day(&mut self) -> Result<DayResult, FundsimError> {
        if self.state.current_day_index >= self.last_day_index {
            return Err(FundsimError::EndOfSeries {
                day_index: self.state.current_day_index,
            });
        }
        self.state.current_day_index += 1;
        self.after_mutation();

        let day_index = self.state.current_day_index;
        info!(
            day = day_index,
            total_assets = self.metrics.total_assets,
            "advanced to next day"
        );
        Ok(DayResult {
            day_index,
            date: self.prices.date(day_index),
            total_assets: self.metrics.total_assets,
            daily_change_pct: self.metrics.daily_change_pct,
            daily_profit: self.metrics.daily_profit,
            is_finished: self.is_finished(),
        })
    }

    /// Throw away the session and start over from the configured initial state.
    pub fn reset(&mut self) {
        self.state = initial_state(&self.config);
        self.ledger = Ledger::new();
        self.last_day_index = horizon(
            &self.config,
            self.state.initial_day_index,
            self.prices.last_index().unwrap_or(0),
        );
        self.after_mutation();
        info!("session reset");
    }

    /// Rebuild every derived metric from state, ledger and prices.
    pub fn recompute_all(&mut self) {
        self.metrics = compute_metrics(&self.state, &self.ledger, &self.prices, &self.config);
    }

    pub fn get_state(&self) -> DerivedSnapshot {
        DerivedSnapshot {
            state: self.state,
            metrics: self.metrics,
            current_date: self.prices.date(self.state.current_day_index),
            last_day_index: self.last_day_index,
            remaining_days: self
                .last_day_index
                .saturating_sub(self.state.current_day_index),
            is_finished: self.is_finished(),
            transaction_count: self.ledger.len(),
        }
    }

    /// Document carrying everything a later session needs to resume.
    pub fn to_document(&self) -> GameDocument {
        GameDocument {
            current_index: self.state.current_day_index,
            initial_index: self.state.initial_day_index,
            cash: self.state.cash,
            units: self.state.units,
            total_assets: self.metrics.total_assets,
            cumulative_profit_rate: self.metrics.cumulative_profit_rate,
            realized_profit: self.metrics.realized_profit,
            ledger: self.ledger.entries().to_vec(),
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.current_day_index >= self.last_day_index
    }

    /// Incremented by every mutation; used to detect unsynced changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn trade_price(&self) -> Result<f64, FundsimError> {
        let day_index = self.state.current_day_index;
        self.prices
            .net_value(day_index)
            .ok_or(FundsimError::InvalidPrice { day_index })
    }

    fn period_average_cost(&self) -> f64 {
        summarize_current_period(self.ledger.entries())
            .average_cost(self.config.cost_basis, self.state.units)
    }

    fn record(&mut self, kind: TransactionKind, amount: f64, units: f64, price: f64) -> Transaction {
        let day_index = self.state.current_day_index;
        let transaction = Transaction {
            kind,
            amount,
            units,
            price,
            day_index,
            date: self.prices.date(day_index),
            timestamp: Utc::now().timestamp_millis(),
        };
        self.ledger.append(transaction.clone());
        transaction
    }

    fn after_mutation(&mut self) {
        self.recompute_all();
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.revision += 1;
    }

    fn trade_result(&self, transaction: Transaction, realized_gain: Option<f64>) -> TradeResult {
        TradeResult {
            transaction,
            cash: self.state.cash,
            units: self.state.units,
            total_assets: self.metrics.total_assets,
            realized_gain,
        }
    }
}

fn initial_state(config: &EngineConfig) -> PortfolioState {
    PortfolioState {
        cash: config.initial_cash,
        units: 0.0,
        current_day_index: config.initial_index,
        initial_day_index: config.initial_index,
    }
}

/// Last playable day: the session length after `initial_index`, capped by the data.
fn horizon(config: &EngineConfig, initial_index: usize, last_available: usize) -> usize {
    initial_index
        .saturating_add(config.total_trading_days)
        .min(last_available)
}

/// Derive all metrics. Pure: the same inputs always yield the same output.
///
/// Order:
/// 1. holding value at the current (or last known) net value
/// 2. total assets = cash + holding value
/// 3. period cost basis from the ledger
/// 4. holding, realized and total profit
/// 5. profit rate and cumulative profit rate
/// 6. day-over-day profit of the held units
pub fn compute_metrics(
    state: &PortfolioState,
    ledger: &Ledger,
    prices: &PriceSeries,
    config: &EngineConfig,
) -> DerivedMetrics {
    let day = state.current_day_index;
    let price = prices.net_value_or_last_known(day);
    let units = state.units;

    let holding_value = units * price;
    let total_assets = state.cash + holding_value;

    let lifetime = summarize_lifetime(ledger.entries());
    let period = summarize_current_period(ledger.entries());
    let avg_cost = period.average_cost(config.cost_basis, units);

    let holding_profit = units * (price - avg_cost);
    let realized_profit = lifetime.realized_profit;
    let total_profit = holding_profit + realized_profit;

    let holding_cost = units * avg_cost;
    let profit_rate = if holding_cost > 0.0 {
        holding_profit / holding_cost * 100.0
    } else {
        0.0
    };
    let cumulative_profit_rate = if lifetime.has_buys() {
        let net = (holding_value + lifetime.total_sell_amount) - lifetime.total_buy_amount;
        safe_divide(net, lifetime.total_buy_amount) * 100.0
    } else {
        safe_divide(total_assets - config.initial_cash, config.initial_cash) * 100.0
    };

    let daily_profit = if day > state.initial_day_index {
        units * (price - prices.net_value_or_last_known(day - 1))
    } else {
        0.0
    };

    DerivedMetrics {
        current_net_value: price,
        daily_change_pct: prices.daily_change_pct(day),
        holding_value,
        total_assets,
        avg_cost,
        holding_profit,
        realized_profit,
        total_profit,
        profit_rate,
        cumulative_profit_rate,
        daily_profit,
        period_invested: period.buy_amount,
        period_sold: period.sell_amount,
        lifetime_invested: lifetime.total_buy_amount,
        lifetime_sold: lifetime.total_sell_amount,
    }
}
