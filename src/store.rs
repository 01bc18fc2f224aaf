//! In-memory retrieval engine: paired vector/item arrays ranked by cosine similarity.
//!
//! `vectors[i]` and `items[i]` always describe the same catalog entry; both are
//! pushed under one write lock, so concurrent `add_item` calls may land in any
//! order but never split a pair.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::Number;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::item::{CatalogItem, MarkupTier, SearchHit};
use crate::normalizer::TextNormalizer;
use crate::persistence::{CatalogPersistence, PersistenceError, StoredCatalog};
use crate::vector_ops::compute_cosine_similarity_simd;

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Default)]
struct StoreState {
    vectors: Vec<Vec<Number>>,
    items: Vec<CatalogItem>,
    initialized: bool,
}

pub struct VectorStore {
    normalizer: TextNormalizer,
    provider: Arc<EmbeddingProvider>,
    persistence: Arc<dyn CatalogPersistence>,
    state: RwLock<StoreState>,
}

impl VectorStore {
    pub fn new(
        normalizer: TextNormalizer,
        provider: Arc<EmbeddingProvider>,
        persistence: Arc<dyn CatalogPersistence>,
    ) -> Self {
        Self {
            normalizer,
            provider,
            persistence,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the embedding model and any previously persisted vectors/items.
    ///
    /// Returns `true` when persisted data was found. On error the store stays
    /// uninitialized.
    pub async fn initialize(&self) -> Result<bool> {
        info!(backend = self.persistence.backend_name(), "initializing vector store");
        let StoredCatalog { vectors, items, .. } = self.persistence.load()?;
        self.restore(vectors, items).await
    }

    /// Installs already-loaded vectors/items after checking they pair up and
    /// match the model's dimension. Loads the model first.
    pub async fn restore(&self, vectors: Vec<Vec<Number>>, items: Vec<CatalogItem>) -> Result<bool> {
        self.provider.warm_up().await?;

        let populated = !vectors.is_empty() || !items.is_empty();
        if populated {
            if vectors.len() != items.len() {
                return Err(PersistenceError::Corrupt(format!(
                    "{} vectors stored for {} items",
                    vectors.len(),
                    items.len()
                ))
                .into());
            }
            let expected = self.provider.dimensions().unwrap_or(vectors[0].len());
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                }
                .into());
            }
        }

        let mut state = self.write();
        if populated {
            state.vectors = vectors;
            state.items = items;
            info!(count = state.vectors.len(), "loaded cached vectors");
        } else {
            state.vectors.clear();
            state.items.clear();
            info!("no cached data found, starting fresh");
        }
        state.initialized = true;
        Ok(populated)
    }

    /// Empties both arrays ahead of a full re-ingestion.
    pub fn reset(&self) {
        let mut state = self.write();
        state.vectors.clear();
        state.items.clear();
        state.initialized = true;
    }

    /// Expands, embeds and appends one item. On failure nothing is appended.
    pub async fn add_item(&self, text: &str, item: CatalogItem) -> Result<()> {
        let enhanced = self.normalizer.enhance(text);
        let embedding = self.provider.embed(&enhanced).await?;

        let mut state = self.write();
        if let Some(first) = state.vectors.first() {
            if first.len() != embedding.len() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: first.len(),
                    actual: embedding.len(),
                }
                .into());
            }
        }
        state.vectors.push(embedding);
        state.items.push(item);
        debug!(count = state.items.len(), "added item");
        Ok(())
    }

    /// Top `k` items by cosine similarity to the expanded query.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if !self.has_data() {
            return Err(Error::NotInitialized);
        }

        let enhanced = self.normalizer.enhance(query);
        debug!(query, enhanced = %enhanced, "processing search query");
        let query_vector = self.provider.embed(&enhanced).await?;

        let start = Instant::now();
        let state = self.read();
        let ranked = rank(&query_vector, &state.vectors, k)?;
        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .map(|(index, score)| SearchHit {
                item: state.items[index].clone(),
                score,
            })
            .collect();

        debug!(
            results = hits.len(),
            scanned = state.vectors.len(),
            elapsed = ?start.elapsed(),
            "search completed"
        );
        Ok(hits)
    }

    pub fn has_data(&self) -> bool {
        let state = self.read();
        state.initialized
            && !state.vectors.is_empty()
            && !state.items.is_empty()
            && state.vectors.len() == state.items.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of the current vector/item arrays.
    pub fn snapshot(&self) -> (Vec<Vec<Number>>, Vec<CatalogItem>) {
        let state = self.read();
        (state.vectors.clone(), state.items.clone())
    }

    /// Persists the current arrays together with the pricing data.
    pub fn save(&self, tiers: &[MarkupTier], labor_rate: f64) -> Result<()> {
        let (vectors, items) = self.snapshot();
        let catalog = StoredCatalog {
            vectors,
            items,
            tiers: tiers.to_vec(),
            labor_rate: Some(labor_rate),
        };
        self.persistence.save(&catalog)?;
        Ok(())
    }

    /// Empties the in-memory arrays and the persisted store.
    pub fn clear_cache(&self) -> Result<()> {
        info!("clearing cache");
        self.persistence.clear()?;
        let mut state = self.write();
        state.vectors.clear();
        state.items.clear();
        Ok(())
    }
}

/// Indices and scores of the `k` vectors closest to `query`, best first.
/// Ties keep insertion order.
pub fn rank(
    query: &[Number],
    vectors: &[Vec<Number>],
    k: usize,
) -> std::result::Result<Vec<(usize, Number)>, EmbeddingError> {
    let scores = vectors
        .par_iter()
        .map(|vector| {
            compute_cosine_similarity_simd(query, vector).ok_or(EmbeddingError::DimensionMismatch {
                expected: vector.len(),
                actual: query.len(),
            })
        })
        .collect::<std::result::Result<Vec<Number>, EmbeddingError>>()?;

    let mut ranked: Vec<(usize, Number)> = scores.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(k);
    Ok(ranked)
}
