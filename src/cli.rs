//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::adapters::csv_adapter::{export_ledger, CsvPriceAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteStore;
use crate::domain::config_validation::{build_engine_config, player_key, validate_game_config};
use crate::domain::engine::{AccountingEngine, DerivedSnapshot, EngineConfig};
use crate::domain::error::FundsimError;
use crate::domain::precision::{
    format_money, format_net_value, format_percentage, round_to, Precision,
};
use crate::domain::price_series::PriceSeries;
use crate::domain::ranking::{rank_players, RankingEntry, MAX_RANKING_LIMIT};
use crate::domain::sync::{PendingSync, SyncCoordinator, SyncResult};
use crate::ports::config_port::ConfigPort;
use crate::ports::persistence_port::PersistencePort;
use crate::ports::price_port::PricePort;

#[derive(Parser, Debug)]
#[command(name = "fundsim", about = "Single-fund trading simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply trading actions to the saved game: buy:<amount>, sell:<units>, sell:all, next
    Play {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(required = true)]
        actions: Vec<Action>,
    },
    /// Show the current portfolio
    Status {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Discard the saved game and start over
    Reset {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write the transaction ledger to a CSV file
    ExportLedger {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a game configuration and its price data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List saved players by total assets
    Ranking {
        #[arg(short, long)]
        config: PathBuf,
        /// Number of players to show (1-100)
        #[arg(short, long, default_value_t = MAX_RANKING_LIMIT)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Buy(f64),
    Sell(SellQuantity),
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SellQuantity {
    Units(f64),
    All,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "next" {
            return Ok(Action::Next);
        }
        let (verb, quantity) = s
            .split_once(':')
            .ok_or_else(|| format!("unknown action '{s}' (expected buy:N, sell:N, sell:all or next)"))?;
        let parse_number = |q: &str| {
            q.parse::<f64>()
                .map_err(|_| format!("invalid quantity '{q}' in action '{s}'"))
        };
        match verb {
            "buy" => Ok(Action::Buy(parse_number(quantity)?)),
            "sell" if quantity == "all" => Ok(Action::Sell(SellQuantity::All)),
            "sell" => Ok(Action::Sell(SellQuantity::Units(parse_number(quantity)?))),
            _ => Err(format!("unknown action '{s}'")),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Play { config, actions } => run_play(&config, &actions),
        Command::Status { config, json } => run_status(&config, json),
        Command::Reset { config } => run_reset(&config),
        Command::ExportLedger { config, output } => run_export_ledger(&config, &output),
        Command::Validate { config } => run_validate(&config),
        Command::Ranking {
            config,
            limit,
            json,
        } => run_ranking(&config, limit, json),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FundsimError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn load_prices(config: &dyn ConfigPort) -> Result<PriceSeries, FundsimError> {
    let path = config
        .get_string("data", "prices")
        .ok_or_else(|| FundsimError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        })?;
    CsvPriceAdapter::new(PathBuf::from(path)).fetch_prices()
}

/// An engine restored from the player's saved game, paired with the
/// coordinator that writes it back.
pub struct Session {
    pub engine: AccountingEngine,
    pub sync: SyncCoordinator,
}

pub fn open_session(config_path: &Path) -> Result<Session, FundsimError> {
    let config = load_config(config_path)?;
    validate_game_config(&config)?;
    let engine_config = build_engine_config(&config)?;
    let prices = load_prices(&config)?;
    let store = Arc::new(SqliteStore::from_config(&config)?);
    let sync = SyncCoordinator::new(store, player_key(&config));

    let saved = sync.load()?;
    let engine = AccountingEngine::initialize(prices, engine_config, saved)?;
    Ok(Session { engine, sync })
}

fn run_play(config_path: &Path, actions: &[Action]) -> Result<(), FundsimError> {
    let session = open_session(config_path)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(play(session, actions))
}

/// Apply `actions` in order. Rejected trades are reported and skipped; a
/// push is started in the background after every day advance and the final
/// state is written before returning.
pub async fn play(mut session: Session, actions: &[Action]) -> Result<(), FundsimError> {
    let mut pending: Option<PendingSync> = None;

    for action in actions {
        match apply(&mut session.engine, *action) {
            Ok(line) => println!("{line}"),
            Err(e) if e.is_rejection() => println!("rejected: {e}"),
            Err(e) => return Err(e),
        }

        if matches!(action, Action::Next) {
            if let Some(push) = pending.take() {
                session.sync.complete(push.wait().await);
            }
            pending = session.sync.spawn_sync(&session.engine);
        }
    }

    if let Some(push) = pending.take() {
        session.sync.complete(push.wait().await);
    }
    if let SyncResult::Failed { error, .. } = session.sync.sync_if_needed(&session.engine) {
        eprintln!("warning: game not saved: {error}");
    }

    print_snapshot(&session.engine.get_state());
    Ok(())
}

fn apply(engine: &mut AccountingEngine, action: Action) -> Result<String, FundsimError> {
    match action {
        Action::Buy(amount) => {
            let trade = engine.buy(amount)?;
            Ok(format!(
                "bought {} units at {} for {}",
                format_units(trade.transaction.units),
                format_net_value(trade.transaction.price),
                format_money(trade.transaction.amount)
            ))
        }
        Action::Sell(quantity) => {
            let units = match quantity {
                SellQuantity::Units(units) => units,
                SellQuantity::All => engine.get_state().state.units,
            };
            let trade = engine.sell(units)?;
            Ok(format!(
                "sold {} units at {} for {} (gain {})",
                format_units(trade.transaction.units),
                format_net_value(trade.transaction.price),
                format_money(trade.transaction.amount),
                format_money(trade.realized_gain.unwrap_or(0.0))
            ))
        }
        Action::Next => {
            let day = engine.advance_day()?;
            let date = day.date.map(|d| d.to_string()).unwrap_or_default();
            let mut line = format!(
                "day {} {}: assets {}, change {}, daily profit {}",
                day.day_index,
                date,
                format_money(day.total_assets),
                format_percentage(day.daily_change_pct),
                format_money(day.daily_profit)
            );
            if day.is_finished {
                line.push_str(" (final day)");
            }
            Ok(line)
        }
    }
}

fn run_status(config_path: &Path, json: bool) -> Result<(), FundsimError> {
    let session = open_session(config_path)?;
    let snapshot = session.engine.get_state();
    if json {
        let report = StatusReport::new(session.sync.key(), &snapshot);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn run_reset(config_path: &Path) -> Result<(), FundsimError> {
    let mut session = open_session(config_path)?;
    session.engine.reset();
    if let SyncResult::Failed { error, .. } = session.sync.sync_if_needed(&session.engine) {
        return Err(error);
    }
    println!("game reset for player '{}'", session.sync.key());
    print_snapshot(&session.engine.get_state());
    Ok(())
}

fn run_export_ledger(config_path: &Path, output: &Path) -> Result<(), FundsimError> {
    let session = open_session(config_path)?;
    export_ledger(session.engine.ledger(), output)?;
    println!(
        "{} transactions written to {}",
        session.engine.ledger().len(),
        output.display()
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), FundsimError> {
    let config = load_config(config_path)?;
    validate_game_config(&config)?;
    let engine_config = build_engine_config(&config)?;
    let prices = load_prices(&config)?;
    let engine = AccountingEngine::new(prices, engine_config.clone())?;

    print_config_summary(&engine_config, &engine);
    println!("configuration is valid");
    Ok(())
}

/// Leaderboard of every game saved in the configured store. Reads only the
/// `[sqlite]` section.
pub fn load_ranking(config_path: &Path, limit: usize) -> Result<Vec<RankingEntry>, FundsimError> {
    let config = load_config(config_path)?;
    let store = SqliteStore::from_config(&config)?;
    Ok(rank_players(store.list()?, limit))
}

fn run_ranking(config_path: &Path, limit: usize, json: bool) -> Result<(), FundsimError> {
    let table = load_ranking(config_path, limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    if table.is_empty() {
        println!("no saved games");
        return Ok(());
    }
    println!("{:>4}  {:<16} {:>14} {:>10} {:>5}", "rank", "player", "total assets", "return", "day");
    for entry in &table {
        println!(
            "{:>4}  {:<16} {:>14} {:>10} {:>5}",
            entry.rank,
            entry.player,
            format_money(entry.total_assets),
            format_percentage(entry.cumulative_profit_rate),
            entry.day_index
        );
    }
    Ok(())
}

fn print_config_summary(config: &EngineConfig, engine: &AccountingEngine) {
    let snapshot = engine.get_state();
    let first = engine.prices().date(0).map(|d| d.to_string()).unwrap_or_default();
    let start = snapshot.current_date.map(|d| d.to_string()).unwrap_or_default();
    println!("price days:      {} (from {first})", engine.prices().len());
    println!("starting day:    {} {start}", config.initial_index);
    println!("last day:        {}", snapshot.last_day_index);
    println!("initial cash:    {}", format_money(config.initial_cash));
    println!("cost basis:      {:?}", config.cost_basis);
}

pub fn print_snapshot(snapshot: &DerivedSnapshot) {
    let m = &snapshot.metrics;
    let date = snapshot
        .current_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    println!("\n=== Day {} {} ===", snapshot.state.current_day_index, date);
    println!("Net Value:        {}", format_net_value(m.current_net_value));
    println!("Cash:             {}", format_money(snapshot.state.cash));
    println!("Units:            {}", format_units(snapshot.state.units));
    println!("Holding Value:    {}", format_money(m.holding_value));
    println!("Total Assets:     {}", format_money(m.total_assets));
    println!("Average Cost:     {}", format_net_value(m.avg_cost));
    println!("Holding Profit:   {}", format_money(m.holding_profit));
    println!("Realized Profit:  {}", format_money(m.realized_profit));
    println!("Profit Rate:      {}", format_percentage(m.profit_rate));
    println!("Total Return:     {}", format_percentage(m.cumulative_profit_rate));
    println!("Transactions:     {}", snapshot.transaction_count);
    if snapshot.is_finished {
        println!("Game finished.");
    } else {
        println!("Days remaining:   {}", snapshot.remaining_days);
    }
}

fn format_units(units: f64) -> String {
    format!("{:.2}", round_to(units, Precision::Units))
}

/// Machine-readable portfolio summary printed by `status --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub player: String,
    pub day_index: usize,
    pub date: Option<String>,
    pub net_value: f64,
    pub cash: f64,
    pub units: f64,
    pub total_assets: f64,
    pub avg_cost: f64,
    pub holding_profit: f64,
    pub realized_profit: f64,
    pub total_profit: f64,
    pub profit_rate: f64,
    pub cumulative_profit_rate: f64,
    pub daily_profit: f64,
    pub remaining_days: usize,
    pub finished: bool,
    pub transactions: usize,
}

impl StatusReport {
    pub fn new(player: &str, snapshot: &DerivedSnapshot) -> Self {
        let m = &snapshot.metrics;
        StatusReport {
            player: player.to_string(),
            day_index: snapshot.state.current_day_index,
            date: snapshot.current_date.map(|d| d.to_string()),
            net_value: round_to(m.current_net_value, Precision::NetValue),
            cash: round_to(snapshot.state.cash, Precision::Money),
            units: round_to(snapshot.state.units, Precision::Units),
            total_assets: round_to(m.total_assets, Precision::Money),
            avg_cost: round_to(m.avg_cost, Precision::NetValue),
            holding_profit: round_to(m.holding_profit, Precision::Money),
            realized_profit: round_to(m.realized_profit, Precision::Money),
            total_profit: round_to(m.total_profit, Precision::Money),
            profit_rate: round_to(m.profit_rate, Precision::Percentage),
            cumulative_profit_rate: round_to(m.cumulative_profit_rate, Precision::Percentage),
            daily_profit: round_to(m.daily_profit, Precision::Money),
            remaining_days: snapshot.remaining_days,
            finished: snapshot.is_finished,
            transactions: snapshot.transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions() {
        assert_eq!("buy:5000".parse::<Action>(), Ok(Action::Buy(5000.0)));
        assert_eq!(
            "sell:12.5".parse::<Action>(),
            Ok(Action::Sell(SellQuantity::Units(12.5)))
        );
        assert_eq!(
            "SELL:ALL".parse::<Action>(),
            Ok(Action::Sell(SellQuantity::All))
        );
        assert_eq!(" next ".parse::<Action>(), Ok(Action::Next));
    }

    #[test]
    fn rejects_malformed_actions() {
        assert!("buy".parse::<Action>().is_err());
        assert!("buy:lots".parse::<Action>().is_err());
        assert!("hold:3".parse::<Action>().is_err());
    }

    #[test]
    fn cli_parses_play_subcommand() {
        let cli = Cli::try_parse_from([
            "fundsim", "play", "--config", "game.ini", "buy:100", "next", "sell:all",
        ])
        .unwrap();
        match cli.command {
            Command::Play { config, actions } => {
                assert_eq!(config, PathBuf::from("game.ini"));
                assert_eq!(actions.len(), 3);
                assert_eq!(actions[2], Action::Sell(SellQuantity::All));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ranking_limit_defaults_to_maximum() {
        let cli = Cli::try_parse_from(["fundsim", "ranking", "--config", "game.ini"]).unwrap();
        match cli.command {
            Command::Ranking { limit, json, .. } => {
                assert_eq!(limit, MAX_RANKING_LIMIT);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn play_requires_actions() {
        assert!(Cli::try_parse_from(["fundsim", "play", "--config", "game.ini"]).is_err());
    }
}
