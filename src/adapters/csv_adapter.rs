//! CSV price file adapter and ledger export.
//!
//! Price files have a header row followed by `date,net_value[,daily_change_pct]`
//! records. When the change column is absent or empty it is derived from the
//! previous day's net value.

use crate::domain::error::FundsimError;
use crate::domain::ledger::Ledger;
use crate::domain::price_series::{PricePoint, PriceSeries};
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_prices(&self) -> Result<PriceSeries, FundsimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| FundsimError::PriceData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let series = parse_prices(&content)?;
        debug!(path = %self.path.display(), days = series.len(), "loaded price series");
        Ok(series)
    }
}

pub fn parse_prices(content: &str) -> Result<PriceSeries, FundsimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows: Vec<(NaiveDate, f64, Option<f64>)> = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| FundsimError::PriceData {
            reason: format!("CSV parse error: {}", e),
        })?;
        let row = line + 2;

        let date_str = record.get(0).ok_or_else(|| FundsimError::PriceData {
            reason: format!("row {row}: missing date column"),
        })?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            FundsimError::PriceData {
                reason: format!("row {row}: invalid date '{date_str}': {e}"),
            }
        })?;

        let net_value: f64 = record
            .get(1)
            .ok_or_else(|| FundsimError::PriceData {
                reason: format!("row {row}: missing net_value column"),
            })?
            .parse()
            .map_err(|e| FundsimError::PriceData {
                reason: format!("row {row}: invalid net_value: {e}"),
            })?;

        let change = match record.get(2).filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => Some(s.parse::<f64>().map_err(|e| FundsimError::PriceData {
                reason: format!("row {row}: invalid daily_change_pct: {e}"),
            })?),
        };

        rows.push((date, net_value, change));
    }

    rows.sort_by_key(|(date, _, _)| *date);

    let mut points = Vec::with_capacity(rows.len());
    let mut previous: Option<f64> = None;
    for (date, net_value, change) in rows {
        let daily_change_pct = change.unwrap_or_else(|| match previous {
            Some(prev) if prev > 0.0 => (net_value - prev) / prev * 100.0,
            _ => 0.0,
        });
        points.push(PricePoint {
            date,
            net_value,
            daily_change_pct,
        });
        previous = Some(net_value);
    }

    Ok(PriceSeries::new(points))
}

/// Write every ledger entry as one CSV row.
pub fn write_ledger_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<(), FundsimError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let io_err = |e: csv::Error| FundsimError::Io {
        reason: e.to_string(),
    };

    wtr.write_record(["kind", "day_index", "date", "price", "units", "amount", "timestamp"])
        .map_err(io_err)?;
    for t in ledger.entries() {
        wtr.write_record([
            t.kind.as_str().to_string(),
            t.day_index.to_string(),
            t.date.map(|d| d.to_string()).unwrap_or_default(),
            format!("{:.4}", t.price),
            format!("{:.4}", t.units),
            format!("{:.2}", t.amount),
            t.timestamp.to_string(),
        ])
        .map_err(io_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_ledger(ledger: &Ledger, path: &Path) -> Result<(), FundsimError> {
    let file = fs::File::create(path)?;
    write_ledger_csv(ledger, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::{Transaction, TransactionKind};
    use tempfile::TempDir;

    const PRICES: &str = "date,net_value,daily_change_pct\n\
        2024-01-16,1.1000,10.0\n\
        2024-01-15,1.0000,0.0\n\
        2024-01-17,1.0450,-5.0\n";

    #[test]
    fn fetch_prices_reads_and_sorts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fund.csv");
        fs::write(&path, PRICES).unwrap();

        let series = CsvPriceAdapter::new(path).fetch_prices().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.date(0), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(series.net_value(1), Some(1.1));
        assert_eq!(series.daily_change_pct(2), -5.0);
    }

    #[test]
    fn missing_file_is_price_data_error() {
        let adapter = CsvPriceAdapter::new(PathBuf::from("/nonexistent/fund.csv"));
        assert!(matches!(
            adapter.fetch_prices(),
            Err(FundsimError::PriceData { .. })
        ));
    }

    #[test]
    fn change_column_is_derived_when_absent() {
        let series = parse_prices("date,net_value\n2024-01-01,2.0\n2024-01-02,2.5\n").unwrap();
        assert_eq!(series.daily_change_pct(0), 0.0);
        assert!((series.daily_change_pct(1) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn bad_net_value_reports_row() {
        let err = parse_prices("date,net_value\n2024-01-01,abc\n").unwrap_err();
        match err {
            FundsimError::PriceData { reason } => assert!(reason.contains("row 2")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_date_rejected() {
        assert!(parse_prices("date,net_value\n01/02/2024,1.0\n").is_err());
    }

    #[test]
    fn ledger_export_writes_header_and_rows() {
        let mut ledger = Ledger::new();
        ledger.append(Transaction {
            kind: TransactionKind::Buy,
            amount: 5000.0,
            units: 5000.0,
            price: 1.0,
            day_index: 29,
            date: NaiveDate::from_ymd_opt(2024, 2, 10),
            timestamp: 42,
        });

        let mut out = Vec::new();
        write_ledger_csv(&ledger, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "kind,day_index,date,price,units,amount,timestamp");
        assert_eq!(lines[1], "buy,29,2024-02-10,1.0000,5000.0000,5000.00,42");
    }

    #[test]
    fn export_ledger_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        export_ledger(&Ledger::new(), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "kind,day_index,date,price,units,amount,timestamp");
    }
}
