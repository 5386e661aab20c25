#![allow(dead_code)]

use chrono::NaiveDate;
use fundsim::domain::document::GameDocument;
use fundsim::domain::engine::{AccountingEngine, EngineConfig};
use fundsim::domain::error::FundsimError;
use fundsim::domain::price_series::{PricePoint, PriceSeries};
use fundsim::ports::persistence_port::PersistencePort;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory persistence port that can be switched offline.
#[derive(Default)]
pub struct MockStore {
    pub documents: Mutex<HashMap<String, GameDocument>>,
    pub failing: AtomicBool,
    pub puts: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn stored(&self, key: &str) -> Option<GameDocument> {
        self.documents.lock().unwrap().get(key).cloned()
    }
}

impl PersistencePort for MockStore {
    fn get(&self, key: &str) -> Result<Option<GameDocument>, FundsimError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FundsimError::Database {
                reason: "store offline".into(),
            });
        }
        Ok(self.stored(key))
    }

    fn put(&self, key: &str, document: &GameDocument) -> Result<(), FundsimError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FundsimError::Database {
                reason: "store offline".into(),
            });
        }
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, GameDocument)>, FundsimError> {
        let mut all: Vec<_> = self
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|(k, d)| (k.clone(), d.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily series starting 2024-01-01 with changes derived from the values.
pub fn series(values: &[f64]) -> PriceSeries {
    let start = date(2024, 1, 1);
    let mut previous: Option<f64> = None;
    let points = values
        .iter()
        .enumerate()
        .map(|(i, &net_value)| {
            let daily_change_pct = match previous {
                Some(prev) if prev > 0.0 => (net_value - prev) / prev * 100.0,
                _ => 0.0,
            };
            previous = Some(net_value);
            PricePoint {
                date: start + chrono::Duration::days(i as i64),
                net_value,
                daily_change_pct,
            }
        })
        .collect();
    PriceSeries::new(points)
}

pub fn config_at(initial_index: usize) -> EngineConfig {
    EngineConfig {
        initial_index,
        ..EngineConfig::default()
    }
}

pub fn engine(values: &[f64]) -> AccountingEngine {
    AccountingEngine::new(series(values), config_at(0)).unwrap()
}

pub fn prices_csv(values: &[f64]) -> String {
    let mut out = String::from("date,net_value,daily_change_pct\n");
    for point in series(values).points() {
        out.push_str(&format!(
            "{},{:.4},{:.2}\n",
            point.date, point.net_value, point.daily_change_pct
        ));
    }
    out
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
