//! Saved-game persistence port trait.

use crate::domain::document::GameDocument;
use crate::domain::error::FundsimError;

/// Key/value store for game documents. `put` overwrites the whole document,
/// so repeating a push is harmless.
pub trait PersistencePort {
    fn get(&self, key: &str) -> Result<Option<GameDocument>, FundsimError>;

    fn put(&self, key: &str, document: &GameDocument) -> Result<(), FundsimError>;

    /// Every saved document with its key, in key order.
    fn list(&self) -> Result<Vec<(String, GameDocument)>, FundsimError>;
}
