//! Error taxonomy shared by the retrieval and pricing core.
//!
//! Malformed numeric fields in source records never surface here: the parser
//! coerces them to zero (or one, for quantities) so dirty catalog data stays
//! usable.

use crate::embedding::EmbeddingError;
use crate::persistence::PersistenceError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Search or pricing was requested before any catalog data was loaded.
    #[error("search index not loaded; ingest catalog data first")]
    NotInitialized,
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}
