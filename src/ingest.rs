use std::collections::HashMap;
use std::time::Instant;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::item::{CatalogItem, MarkupTier, PartItem, RepairItem};
use crate::parser::ParsedCatalog;
use crate::search::SearchEngine;
use crate::store::VectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub repairs: usize,
    pub parts: usize,
    pub tiers: usize,
    pub indexed: usize,
    pub batches: usize,
}

/// Attaches each part to the repairs sharing its repair number and lists
/// repairs first, then parts. Items with a blank description are dropped.
pub fn assemble_items(repairs: Vec<RepairItem>, parts: &[PartItem]) -> Vec<CatalogItem> {
    let mut by_repair: HashMap<&str, Vec<PartItem>> = HashMap::new();
    for part in parts {
        by_repair
            .entry(part.repair_number.as_str())
            .or_default()
            .push(part.clone());
    }

    let repairs = repairs.into_iter().map(|mut repair| {
        if let Some(attached) = by_repair.get(repair.repair_number.as_str()) {
            repair.associated_parts = attached.clone();
        }
        CatalogItem::Repair(repair)
    });
    let parts = parts.iter().cloned().map(CatalogItem::Part);

    repairs
        .chain(parts)
        .filter(|item| !item.description().trim().is_empty())
        .collect()
}

/// Rebuilds the index from parsed files, persists it with the pricing data
/// and swaps the engine's pricing over. A failed batch or a failed save aborts
/// the run and leaves the in-memory store empty; the engine's pricing and the
/// persisted catalog are only replaced on success.
pub async fn ingest(
    engine: &mut SearchEngine,
    catalog: ParsedCatalog,
    labor_rate: f64,
    batch_size: usize,
) -> Result<IngestReport> {
    let start = Instant::now();
    let ParsedCatalog {
        repairs,
        parts,
        tiers,
    } = catalog;
    let repair_count = repairs.len();
    let part_count = parts.len();

    let items = assemble_items(repairs, &parts);
    let batch_size = batch_size.max(1);
    let total_batches = items.len().div_ceil(batch_size);
    info!(items = items.len(), batch_size, total_batches, "starting ingestion");

    let store = engine.store();
    store.reset();
    if let Err(err) = rebuild(store, &items, batch_size, &tiers, labor_rate).await {
        warn!(error = %err, "ingestion aborted");
        store.reset();
        return Err(err);
    }

    let report = IngestReport {
        repairs: repair_count,
        parts: part_count,
        tiers: tiers.len(),
        indexed: store.len(),
        batches: total_batches,
    };
    engine.replace_pricing(tiers, labor_rate);

    info!(?report, elapsed = ?start.elapsed(), "ingestion finished");
    Ok(report)
}

async fn rebuild(
    store: &VectorStore,
    items: &[CatalogItem],
    batch_size: usize,
    tiers: &[MarkupTier],
    labor_rate: f64,
) -> Result<()> {
    let total_batches = items.len().div_ceil(batch_size);
    for (index, batch) in items.chunks(batch_size).enumerate() {
        let adds = batch
            .iter()
            .map(|item| store.add_item(item.description(), item.clone()));
        try_join_all(adds).await?;
        info!(batch = index + 1, total = total_batches, "processed batch");
    }
    store.save(tiers, labor_rate)
}
