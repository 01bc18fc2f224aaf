use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Number;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::item::{CatalogItem, MarkupTier};
use crate::normalizer::TextNormalizer;
use crate::persistence::{CatalogPersistence, StoredCatalog};
use crate::pricing::{format_currency, PricedItem, PricingEngine};
use crate::store::VectorStore;

/// A ranked match with its computed price.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub item: CatalogItem,
    pub score: Number,
    pub price: PricedItem,
    pub formatted_total: String,
}

pub struct SearchEngine {
    store: VectorStore,
    pricing: PricingEngine,
    persistence: Arc<dyn CatalogPersistence>,
}

impl SearchEngine {
    pub fn new(
        normalizer: TextNormalizer,
        provider: Arc<EmbeddingProvider>,
        persistence: Arc<dyn CatalogPersistence>,
    ) -> Self {
        let store = VectorStore::new(normalizer, provider, Arc::clone(&persistence));
        Self {
            store,
            pricing: PricingEngine::default(),
            persistence,
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Loads the persisted catalog once and hands vectors/items to the store.
    /// Pricing data is installed only after the store accepts them, so a
    /// failed start leaves the engine without data.
    /// Returns whether persisted vectors were found.
    pub async fn initialize(&mut self) -> Result<bool> {
        info!(backend = self.persistence.backend_name(), "initializing search engine");
        let StoredCatalog {
            vectors,
            items,
            tiers,
            labor_rate,
        } = self.persistence.load()?;

        let populated = self.store.restore(vectors, items).await?;

        let labor_rate = labor_rate.unwrap_or(0.0);
        debug!(tiers = tiers.len(), labor_rate, "loaded pricing data");
        self.pricing.replace(tiers, labor_rate);
        Ok(populated)
    }

    /// Replaces the pricing data after an ingestion.
    pub fn replace_pricing(&mut self, tiers: Vec<MarkupTier>, labor_rate: f64) {
        self.pricing.replace(tiers, labor_rate);
    }

    /// Ready to serve priced results: vectors present, tiers present, labor rate positive.
    pub fn has_data(&self) -> bool {
        self.store.has_data() && self.pricing.is_configured()
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Quote>> {
        if !self.has_data() {
            return Err(Error::NotInitialized);
        }

        let start = Instant::now();
        let hits = self.store.search(query, k).await?;
        let quotes: Vec<Quote> = hits
            .into_iter()
            .map(|hit| {
                let price = self.pricing.price_item(&hit.item);
                Quote {
                    formatted_total: format_currency(price.total),
                    item: hit.item,
                    score: hit.score,
                    price,
                }
            })
            .collect();

        info!(query, results = quotes.len(), elapsed = ?start.elapsed(), "search finished");
        Ok(quotes)
    }

    pub fn price_item(&self, item: &CatalogItem) -> Result<PricedItem> {
        if !self.pricing.is_configured() {
            return Err(Error::NotInitialized);
        }
        Ok(self.pricing.price_item(item))
    }

    /// Drops all catalog and pricing data, in memory and in storage.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.store.clear_cache()?;
        self.pricing.clear();
        info!("search engine cache cleared");
        Ok(())
    }
}
