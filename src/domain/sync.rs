//! Outbound replication of engine state to the persistence port.
//!
//! The in-memory engine is always authoritative. A push that fails only
//! leaves the coordinator behind the engine's revision, so the next call to
//! [`SyncCoordinator::sync_if_needed`] retries with the full, current state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::document::GameDocument;
use super::engine::AccountingEngine;
use super::error::FundsimError;
use crate::ports::persistence_port::PersistencePort;

pub type SharedPersistence = Arc<dyn PersistencePort + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult {
    /// Nothing changed since the last confirmed push.
    Skipped,
    /// A background push of this revision has not completed yet.
    InFlight { revision: u64 },
    Synced { revision: u64 },
    Failed { revision: u64, error: FundsimError },
}

impl SyncResult {
    /// True when the store holds everything the engine had at call time.
    /// An in-flight push is not yet a success.
    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Skipped | SyncResult::Synced { .. })
    }
}

pub struct SyncCoordinator {
    port: SharedPersistence,
    key: String,
    synced_revision: u64,
    in_flight: Option<u64>,
    last_synced_at: Option<DateTime<Utc>>,
    last_error: Option<FundsimError>,
}

impl SyncCoordinator {
    pub fn new(port: SharedPersistence, key: impl Into<String>) -> Self {
        SyncCoordinator {
            port,
            key: key.into(),
            synced_revision: 0,
            in_flight: None,
            last_synced_at: None,
            last_error: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True while the engine holds changes the store has not confirmed.
    pub fn needs_sync(&self, engine: &AccountingEngine) -> bool {
        engine.revision() > self.synced_revision
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn last_error(&self) -> Option<&FundsimError> {
        self.last_error.as_ref()
    }

    /// Load the saved document for this coordinator's key, if any.
    pub fn load(&self) -> Result<Option<GameDocument>, FundsimError> {
        self.port.get(&self.key)
    }

    /// Push the engine's document on the calling thread when it is dirty.
    /// Never returns an error: failures are logged and reported in the result.
    pub fn sync_if_needed(&mut self, engine: &AccountingEngine) -> SyncResult {
        if let Some(revision) = self.in_flight {
            return SyncResult::InFlight { revision };
        }
        if !self.needs_sync(engine) {
            return SyncResult::Skipped;
        }
        let result = push(
            self.port.as_ref(),
            &self.key,
            engine.revision(),
            &engine.to_document(),
        );
        self.complete(result.clone());
        result
    }

    /// Push the engine's document on Tokio's blocking pool without holding
    /// up further engine operations. Must be called from within a Tokio
    /// runtime. Hand the awaited result to [`SyncCoordinator::complete`];
    /// until then no other push is started.
    pub fn spawn_sync(&mut self, engine: &AccountingEngine) -> Option<PendingSync> {
        if self.in_flight.is_some() || !self.needs_sync(engine) {
            return None;
        }
        let revision = engine.revision();
        self.in_flight = Some(revision);
        let document = engine.to_document();
        let port = Arc::clone(&self.port);
        let key = self.key.clone();
        let handle =
            tokio::task::spawn_blocking(move || push(port.as_ref(), &key, revision, &document));
        Some(PendingSync { revision, handle })
    }

    /// Record the outcome of a push.
    pub fn complete(&mut self, result: SyncResult) {
        let revision = match &result {
            SyncResult::Skipped | SyncResult::InFlight { .. } => return,
            SyncResult::Synced { revision } | SyncResult::Failed { revision, .. } => *revision,
        };
        if self.in_flight == Some(revision) {
            self.in_flight = None;
        }
        match result {
            SyncResult::Skipped | SyncResult::InFlight { .. } => {}
            SyncResult::Synced { revision } => {
                self.synced_revision = self.synced_revision.max(revision);
                self.last_synced_at = Some(Utc::now());
                self.last_error = None;
            }
            SyncResult::Failed { revision, error } => {
                warn!(key = %self.key, revision, %error, "sync failed, will retry");
                self.last_error = Some(error);
            }
        }
    }
}

/// A push running in the background.
pub struct PendingSync {
    revision: u64,
    handle: JoinHandle<SyncResult>,
}

impl PendingSync {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub async fn wait(self) -> SyncResult {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => SyncResult::Failed {
                revision: self.revision,
                error: FundsimError::SyncFailure {
                    reason: format!("sync task aborted: {e}"),
                },
            },
        }
    }
}

fn push(
    port: &(dyn PersistencePort + Send + Sync),
    key: &str,
    revision: u64,
    document: &GameDocument,
) -> SyncResult {
    match port.put(key, document) {
        Ok(()) => {
            debug!(key, revision, "game document pushed");
            SyncResult::Synced { revision }
        }
        Err(e) => SyncResult::Failed {
            revision,
            error: FundsimError::SyncFailure {
                reason: e.to_string(),
            },
        },
    }
}
