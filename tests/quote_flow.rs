use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use partsearch::embedding::{EmbeddingProvider, HashingLoader};
use partsearch::normalizer::{MatchMode, TextNormalizer};
use partsearch::persistence::{CatalogPersistence, LmdbCatalogStore};
use partsearch::retry::RetryPolicy;
use partsearch::search::SearchEngine;
use partsearch::terms::TermDictionary;
use partsearch::{ingest, parser, CatalogItem, Error};
use tempfile::TempDir;

const DIMENSIONS: usize = 64;

fn repair_line(number: &str, description: &str, labor: &str, parts: &str) -> String {
    format!(
        "{:<6} {:<3} {:<3} {:<45} {:>5} {:>7} {:>7}",
        number, "HVA", "GEN", description, labor, parts, "0.00"
    )
}

fn part_line(repair: &str, part: &str, description: &str, cost: &str, quantity: &str) -> String {
    format!(
        "{:<6} {:<6} {:<30} {:<3} {:<20} {:<3} {:<20} {:>7} {:>4}",
        repair, part, description, "GEN", "", "V01", "", cost, quantity
    )
}

fn write_sources(dir: &Path) -> (Vec<PathBuf>, PathBuf, PathBuf) {
    let repairs = dir.join("repairs.txt");
    let parts = dir.join("parts.txt");
    let markup = dir.join("markup.txt");

    let repair_lines = [
        repair_line("100100", "RECHARGE R-410A SYSTEM", "1.50", "40.00"),
        repair_line("100200", "REPLACE RUN CAPACITOR", "0.75", "12.50"),
        repair_line("200100", "REPLACE WAX RING", "1.00", "8.00"),
    ];
    let part_lines = [
        part_line("100200", "CAP455", "RUN CAPACITOR 45/5", "12.50", "1"),
        part_line("100100", "R410A", "R-410A REFRIGERANT PER LB", "", "2"),
    ];
    let markup_lines = [
        "FROM     THROUGH  MULT".to_string(),
        format!("{:>8} {:>8} {:>8}", "0.00", "50.00", "2.50"),
        format!("{:>8} {:>8} {:>8}", "50.01", "200.00", "1.80"),
    ];

    fs::write(&repairs, repair_lines.join("\n")).unwrap();
    fs::write(&parts, part_lines.join("\n")).unwrap();
    fs::write(&markup, markup_lines.join("\n")).unwrap();
    (vec![repairs], parts, markup)
}

fn open_engine(path: &Path) -> SearchEngine {
    let persistence: Arc<dyn CatalogPersistence> = Arc::new(LmdbCatalogStore::open(path).unwrap());
    let normalizer = TextNormalizer::new(Arc::new(TermDictionary::trade_defaults()), MatchMode::Substring);
    let provider = EmbeddingProvider::new(
        Arc::new(HashingLoader::new(DIMENSIONS)),
        RetryPolicy::new(3, Duration::from_millis(1)),
    );
    SearchEngine::new(normalizer, Arc::new(provider), persistence)
}

#[tokio::test]
async fn ingest_persist_reload_and_quote() {
    let sources = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let (repairs, parts, markup) = write_sources(sources.path());

    let catalog = parser::load_catalog(&repairs, &parts, &markup).unwrap();
    assert_eq!(catalog.tiers.len(), 2);

    {
        let mut engine = open_engine(db.path());
        let report = ingest::ingest(&mut engine, catalog, 95.0, 2).await.unwrap();
        assert_eq!(report.indexed, 5);
        assert_eq!(report.batches, 3);
    }

    let mut engine = open_engine(db.path());
    assert!(!engine.has_data());
    assert!(engine.initialize().await.unwrap());
    assert!(engine.has_data());
    assert_eq!(engine.pricing().labor_rate(), 95.0);

    let quotes = engine.search("Recharge R-410A system", 3).await.unwrap();
    assert_eq!(quotes.len(), 3);
    let top = &quotes[0];
    assert_eq!(top.item.number(), "100100");
    assert!((top.score - 1.0).abs() < 1e-5);

    // 1.5h * 95 + 2 lb refrigerant at the default 40.00 marked up 2.5x
    assert!((top.price.total - 342.5).abs() < 1e-9);
    assert_eq!(top.formatted_total, "$342.50");
    match &top.item {
        CatalogItem::Repair(repair) => {
            assert_eq!(repair.associated_parts.len(), 1);
            assert!(repair.associated_parts[0].is_refrigerant);
        }
        other => panic!("expected a repair, got {other:?}"),
    }

    let capacitor = engine.search("run capacitor 45/5", 5).await.unwrap();
    let total = capacitor
        .iter()
        .find(|quote| quote.item.number() == "CAP455")
        .map(|quote| quote.price.total);
    assert_eq!(total, Some(31.25));
}

#[tokio::test]
async fn clear_removes_persisted_catalog() {
    let sources = TempDir::new().unwrap();
    let db = TempDir::new().unwrap();
    let (repairs, parts, markup) = write_sources(sources.path());
    let catalog = parser::load_catalog(&repairs, &parts, &markup).unwrap();

    {
        let mut engine = open_engine(db.path());
        ingest::ingest(&mut engine, catalog, 95.0, 50).await.unwrap();
        engine.clear_cache().unwrap();
        assert!(!engine.has_data());
    }

    let mut engine = open_engine(db.path());
    assert!(!engine.initialize().await.unwrap());
    assert!(!engine.has_data());
    assert!(matches!(engine.search("capacitor", 5).await, Err(Error::NotInitialized)));
}
