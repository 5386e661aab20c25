//! Core domain types and logic: the portfolio accounting engine and the
//! ledger arithmetic it is built on.

pub mod precision;
pub mod price_series;
pub mod transaction;
pub mod ledger;
pub mod engine;
pub mod document;
pub mod sync;
pub mod ranking;
pub mod config_validation;
pub mod error;
