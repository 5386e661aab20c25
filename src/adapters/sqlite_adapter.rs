//! SQLite saved-game store.
//!
//! Each player's game is one row holding the JSON-encoded [`GameDocument`].
//! Writes replace the whole row.

use crate::domain::document::GameDocument;
use crate::domain::error::FundsimError;
use crate::ports::config_port::ConfigPort;
use crate::ports::persistence_port::PersistencePort;
use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FundsimError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FundsimError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| FundsimError::Database {
                    reason: e.to_string(),
                })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, FundsimError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| FundsimError::Database {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn initialize_schema(&self) -> Result<(), FundsimError> {
        self.connection()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS game_documents (
                    key TEXT PRIMARY KEY NOT NULL,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );",
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, FundsimError> {
        self.pool.get().map_err(|e: r2d2::Error| FundsimError::Database {
            reason: e.to_string(),
        })
    }
}

fn query_error(e: rusqlite::Error) -> FundsimError {
    FundsimError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PersistencePort for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<GameDocument>, FundsimError> {
        let body: Option<String> = self
            .connection()?
            .query_row(
                "SELECT body FROM game_documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        body.map(|json| serde_json::from_str(&json).map_err(FundsimError::from))
            .transpose()
    }

    fn put(&self, key: &str, document: &GameDocument) -> Result<(), FundsimError> {
        let body = serde_json::to_string(document)?;
        self.connection()?
            .execute(
                "INSERT INTO game_documents (key, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![key, body, Utc::now().to_rfc3339()],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, GameDocument)>, FundsimError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT key, body FROM game_documents ORDER BY key")
            .map_err(query_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(query_error)?;

        let mut documents = Vec::new();
        for row in rows {
            let (key, body) = row.map_err(query_error)?;
            documents.push((key, serde_json::from_str(&body)?));
        }
        Ok(documents)
    }
}
