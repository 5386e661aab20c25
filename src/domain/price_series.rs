//! Daily net-value series of the simulated fund.

use chrono::NaiveDate;

/// Net value used when no valid price is known at or before a day.
pub const NEUTRAL_NET_VALUE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub net_value: f64,
    pub daily_change_pct: f64,
}

impl PricePoint {
    pub fn is_valid(&self) -> bool {
        self.net_value.is_finite() && self.net_value > 0.0
    }
}

/// Ordered, immutable sequence of daily prices addressed by day offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        PriceSeries { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, day_index: usize) -> Option<&PricePoint> {
        self.points.get(day_index)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn last_index(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    /// Strict lookup for trading: `None` when the day is missing or its
    /// net value is not a positive number.
    pub fn net_value(&self, day_index: usize) -> Option<f64> {
        self.points
            .get(day_index)
            .filter(|p| p.is_valid())
            .map(|p| p.net_value)
    }

    /// Lenient lookup for valuation: the last valid net value at or before
    /// `day_index`, or [`NEUTRAL_NET_VALUE`] when there is none.
    pub fn net_value_or_last_known(&self, day_index: usize) -> f64 {
        let Some(last) = self.last_index() else {
            return NEUTRAL_NET_VALUE;
        };
        self.points[..=day_index.min(last)]
            .iter()
            .rev()
            .find(|p| p.is_valid())
            .map(|p| p.net_value)
            .unwrap_or(NEUTRAL_NET_VALUE)
    }

    pub fn daily_change_pct(&self, day_index: usize) -> f64 {
        self.points
            .get(day_index)
            .map(|p| p.daily_change_pct)
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
    }

    pub fn date(&self, day_index: usize) -> Option<NaiveDate> {
        self.points.get(day_index).map(|p| p.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, net_value: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            net_value,
            daily_change_pct: 0.5,
        }
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::new(vec![point(1, 1.0), point(2, 0.0), point(3, 1.2)])
    }

    #[test]
    fn strict_lookup_rejects_non_positive() {
        let series = sample_series();
        assert_eq!(series.net_value(0), Some(1.0));
        assert_eq!(series.net_value(1), None);
        assert_eq!(series.net_value(2), Some(1.2));
        assert_eq!(series.net_value(3), None);
    }

    #[test]
    fn lenient_lookup_falls_back_to_last_known() {
        let series = sample_series();
        assert_eq!(series.net_value_or_last_known(1), 1.0);
        assert_eq!(series.net_value_or_last_known(2), 1.2);
        assert_eq!(series.net_value_or_last_known(50), 1.2);
    }

    #[test]
    fn lenient_lookup_neutral_without_data() {
        let empty = PriceSeries::default();
        assert_eq!(empty.net_value_or_last_known(0), NEUTRAL_NET_VALUE);

        let all_bad = PriceSeries::new(vec![point(1, f64::NAN), point(2, -3.0)]);
        assert_eq!(all_bad.net_value_or_last_known(1), NEUTRAL_NET_VALUE);
    }

    #[test]
    fn last_index_and_dates() {
        let series = sample_series();
        assert_eq!(series.last_index(), Some(2));
        assert_eq!(series.date(2), NaiveDate::from_ymd_opt(2024, 3, 3));
        assert_eq!(series.date(9), None);
        assert_eq!(PriceSeries::default().last_index(), None);
    }

    #[test]
    fn daily_change_defaults_to_zero() {
        let series = sample_series();
        assert_eq!(series.daily_change_pct(0), 0.5);
        assert_eq!(series.daily_change_pct(10), 0.0);
    }
}
