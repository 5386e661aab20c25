//! Configuration validation.
//!
//! Checks every config field before a session starts and builds the
//! [`EngineConfig`] from them.

use crate::domain::engine::{
    DEFAULT_INITIAL_CASH, DEFAULT_INITIAL_INDEX, DEFAULT_TOTAL_TRADING_DAYS, EngineConfig,
};
use crate::domain::error::FundsimError;
use crate::domain::ledger::CostBasisMethod;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_PLAYER: &str = "default";

pub fn validate_game_config(config: &dyn ConfigPort) -> Result<(), FundsimError> {
    validate_initial_cash(config)?;
    validate_initial_index(config)?;
    validate_trading_days(config)?;
    validate_cost_basis(config)?;
    validate_prices_path(config)?;
    Ok(())
}

/// Validate, then assemble the engine settings with defaults for absent keys.
pub fn build_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, FundsimError> {
    validate_initial_cash(config)?;
    validate_initial_index(config)?;
    validate_trading_days(config)?;
    let cost_basis = validate_cost_basis(config)?;
    Ok(EngineConfig {
        initial_cash: config.get_double("game", "initial_cash", DEFAULT_INITIAL_CASH),
        initial_index: config.get_int("game", "initial_index", DEFAULT_INITIAL_INDEX as i64)
            as usize,
        total_trading_days: config.get_int(
            "game",
            "total_trading_days",
            DEFAULT_TOTAL_TRADING_DAYS as i64,
        ) as usize,
        cost_basis,
    })
}

/// Persistence key of the player whose game is loaded and saved.
pub fn player_key(config: &dyn ConfigPort) -> String {
    config.get_string_or("game", "player", DEFAULT_PLAYER)
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), FundsimError> {
    let value = config.get_double("game", "initial_cash", DEFAULT_INITIAL_CASH);
    if !value.is_finite() || value <= 0.0 {
        return Err(FundsimError::ConfigInvalid {
            section: "game".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_initial_index(config: &dyn ConfigPort) -> Result<(), FundsimError> {
    let value = config.get_int("game", "initial_index", DEFAULT_INITIAL_INDEX as i64);
    if value < 0 {
        return Err(FundsimError::ConfigInvalid {
            section: "game".to_string(),
            key: "initial_index".to_string(),
            reason: "initial_index must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_trading_days(config: &dyn ConfigPort) -> Result<(), FundsimError> {
    let value = config.get_int(
        "game",
        "total_trading_days",
        DEFAULT_TOTAL_TRADING_DAYS as i64,
    );
    if value < 1 {
        return Err(FundsimError::ConfigInvalid {
            section: "game".to_string(),
            key: "total_trading_days".to_string(),
            reason: "total_trading_days must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_cost_basis(config: &dyn ConfigPort) -> Result<CostBasisMethod, FundsimError> {
    match config.get_string("engine", "cost_basis") {
        None => Ok(CostBasisMethod::default()),
        Some(s) => s.parse().map_err(|reason| FundsimError::ConfigInvalid {
            section: "engine".to_string(),
            key: "cost_basis".to_string(),
            reason,
        }),
    }
}

fn validate_prices_path(config: &dyn ConfigPort) -> Result<(), FundsimError> {
    match config.get_string("data", "prices") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(FundsimError::ConfigMissing {
            section: "data".to_string(),
            key: "prices".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockConfig {
        values: HashMap<(String, String), String>,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                values: HashMap::new(),
            }
        }

        fn set(mut self, section: &str, key: &str, value: &str) -> Self {
            self.values
                .insert((section.to_string(), key.to_string()), value.to_string());
            self
        }

        fn valid() -> Self {
            Self::new().set("data", "prices", "prices.csv")
        }
    }

    impl ConfigPort for MockConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn assert_invalid(result: Result<(), FundsimError>, expected_key: &str) {
        match result {
            Err(FundsimError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn minimal_config_is_valid() {
        assert!(validate_game_config(&MockConfig::valid()).is_ok());
    }

    #[test]
    fn defaults_fill_engine_config() {
        let config = build_engine_config(&MockConfig::valid()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(player_key(&MockConfig::valid()), "default");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = MockConfig::valid()
            .set("game", "initial_cash", "5000")
            .set("game", "initial_index", "3")
            .set("game", "total_trading_days", "20")
            .set("game", "player", "alice")
            .set("engine", "cost_basis", "net_investment");
        let config = build_engine_config(&cfg).unwrap();
        assert_eq!(config.initial_cash, 5000.0);
        assert_eq!(config.initial_index, 3);
        assert_eq!(config.total_trading_days, 20);
        assert_eq!(config.cost_basis, CostBasisMethod::NetInvestment);
        assert_eq!(player_key(&cfg), "alice");
    }

    #[test]
    fn non_positive_cash_rejected() {
        let cfg = MockConfig::valid().set("game", "initial_cash", "0");
        assert_invalid(validate_game_config(&cfg), "initial_cash");
    }

    #[test]
    fn negative_index_rejected() {
        let cfg = MockConfig::valid().set("game", "initial_index", "-1");
        assert_invalid(validate_game_config(&cfg), "initial_index");
    }

    #[test]
    fn zero_trading_days_rejected() {
        let cfg = MockConfig::valid().set("game", "total_trading_days", "0");
        assert_invalid(validate_game_config(&cfg), "total_trading_days");
    }

    #[test]
    fn unknown_cost_basis_rejected() {
        let cfg = MockConfig::valid().set("engine", "cost_basis", "fifo");
        assert_invalid(validate_game_config(&cfg), "cost_basis");
    }

    #[test]
    fn missing_prices_path() {
        let result = validate_game_config(&MockConfig::new());
        assert!(matches!(
            result,
            Err(FundsimError::ConfigMissing { ref section, ref key })
                if section == "data" && key == "prices"
        ));
    }
}
