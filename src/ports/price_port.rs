//! Price data access port trait.

use crate::domain::error::FundsimError;
use crate::domain::price_series::PriceSeries;

pub trait PricePort {
    /// Load the full daily net-value series, oldest day first.
    fn fetch_prices(&self) -> Result<PriceSeries, FundsimError>;
}
