pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod item;
pub mod normalizer;
pub mod parser;
pub mod persistence;
pub mod pricing;
pub mod retry;
pub mod search;
pub mod store;
pub mod terms;
pub mod vector_ops;

pub use embedding::{EmbeddingError, EmbeddingModel, EmbeddingProvider, HashingLoader, ModelLoader};
pub use error::{Error, Result};
pub use ingest::{ingest, IngestReport};
pub use item::{CatalogItem, MarkupTier, PartItem, RepairItem, SearchHit};
pub use normalizer::{MatchMode, TextNormalizer};
pub use parser::ParsedCatalog;
pub use persistence::{CatalogPersistence, LmdbCatalogStore, MemoryCatalogStore, StoredCatalog};
pub use pricing::{PricedItem, PricingEngine};
pub use search::{Quote, SearchEngine};
pub use store::VectorStore;
pub use terms::TermDictionary;
