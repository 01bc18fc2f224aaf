//! Load/save contract for catalog data, with an LMDB backend and an in-memory one.
//!
//! `save` replaces everything previously stored. `load` on an empty store
//! returns empty containers rather than an error, so "no data" and "empty"
//! look the same to callers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use heed::types::{Bytes, Str};
use heed::EnvOpenOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Number;
use crate::item::{CatalogItem, MarkupTier};

const LABOR_RATE_KEY: &str = "labor_rate";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage error: {0}")]
    Storage(#[from] heed::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is inconsistent: {0}")]
    Corrupt(String),
}

/// Everything the engines persist, in stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCatalog {
    pub vectors: Vec<Vec<Number>>,
    pub items: Vec<CatalogItem>,
    pub tiers: Vec<MarkupTier>,
    pub labor_rate: Option<f64>,
}

impl StoredCatalog {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty() && self.items.is_empty() && self.tiers.is_empty()
    }
}

/// Storage adapter. Calls block; an implementation is free to do its I/O
/// however it likes behind them.
pub trait CatalogPersistence: Send + Sync {
    fn save(&self, catalog: &StoredCatalog) -> Result<(), PersistenceError>;

    fn load(&self) -> Result<StoredCatalog, PersistenceError>;

    fn clear(&self) -> Result<(), PersistenceError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

pub struct LmdbCatalogStore {
    env: heed::Env,
    vectors: heed::Database<Str, Bytes>,
    items: heed::Database<Str, Bytes>,
    tiers: heed::Database<Str, Bytes>,
    meta: heed::Database<Str, Bytes>,
    path: PathBuf,
}

impl LmdbCatalogStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = PathBuf::from(path.as_ref());
        fs::create_dir_all(&path)?;

        debug!(path = %path.display(), "opening LMDB environment");
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(10 * 1024 * 1024 * 1024) // 10GB
                .max_dbs(4)
                .open(&path)?
        };

        let mut wtxn = env.write_txn()?;
        let vectors = env.create_database(&mut wtxn, Some("vectors"))?;
        let items = env.create_database(&mut wtxn, Some("items"))?;
        let tiers = env.create_database(&mut wtxn, Some("tiers"))?;
        let meta = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        info!(path = %path.display(), "catalog store opened");
        Ok(Self {
            env,
            vectors,
            items,
            tiers,
            meta,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all<T: serde::de::DeserializeOwned>(
        db: &heed::Database<Str, Bytes>,
        rtxn: &heed::RoTxn,
    ) -> Result<Vec<T>, PersistenceError> {
        db.iter(rtxn)?
            .map(|entry| -> Result<T, PersistenceError> {
                let (_, bytes) = entry?;
                Ok(bincode::deserialize(bytes)?)
            })
            .collect()
    }

    fn write_all<T: Serialize>(
        db: &heed::Database<Str, Bytes>,
        wtxn: &mut heed::RwTxn,
        values: &[T],
    ) -> Result<(), PersistenceError> {
        for (index, value) in values.iter().enumerate() {
            let bytes = bincode::serialize(value)?;
            db.put(wtxn, &index_key(index), &bytes)?;
        }
        Ok(())
    }

    fn clear_all(&self, wtxn: &mut heed::RwTxn) -> Result<(), PersistenceError> {
        self.vectors.clear(wtxn)?;
        self.items.clear(wtxn)?;
        self.tiers.clear(wtxn)?;
        self.meta.clear(wtxn)?;
        Ok(())
    }
}

/// Zero-padded so key order equals insertion order.
fn index_key(index: usize) -> String {
    format!("{:010}", index)
}

impl CatalogPersistence for LmdbCatalogStore {
    fn save(&self, catalog: &StoredCatalog) -> Result<(), PersistenceError> {
        let mut wtxn = self.env.write_txn()?;
        self.clear_all(&mut wtxn)?;
        Self::write_all(&self.vectors, &mut wtxn, &catalog.vectors)?;
        Self::write_all(&self.items, &mut wtxn, &catalog.items)?;
        Self::write_all(&self.tiers, &mut wtxn, &catalog.tiers)?;
        if let Some(rate) = catalog.labor_rate {
            let bytes = bincode::serialize(&rate)?;
            self.meta.put(&mut wtxn, LABOR_RATE_KEY, &bytes)?;
        }
        wtxn.commit()?;

        info!(
            vectors = catalog.vectors.len(),
            items = catalog.items.len(),
            tiers = catalog.tiers.len(),
            "catalog saved"
        );
        Ok(())
    }

    fn load(&self) -> Result<StoredCatalog, PersistenceError> {
        let rtxn = self.env.read_txn()?;
        let vectors = Self::read_all(&self.vectors, &rtxn)?;
        let items = Self::read_all(&self.items, &rtxn)?;
        let tiers = Self::read_all(&self.tiers, &rtxn)?;
        let labor_rate = match self.meta.get(&rtxn, LABOR_RATE_KEY)? {
            Some(bytes) => Some(bincode::deserialize(bytes)?),
            None => None,
        };

        debug!(
            vectors = vectors.len(),
            items = items.len(),
            tiers = tiers.len(),
            "catalog loaded"
        );
        Ok(StoredCatalog {
            vectors,
            items,
            tiers,
            labor_rate,
        })
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut wtxn = self.env.write_txn()?;
        self.clear_all(&mut wtxn)?;
        wtxn.commit()?;
        info!("catalog store cleared");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "lmdb"
    }
}

/// In-memory persistence for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryCatalogStore {
    catalog: RwLock<StoredCatalog>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogPersistence for MemoryCatalogStore {
    fn save(&self, catalog: &StoredCatalog) -> Result<(), PersistenceError> {
        let mut stored = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        *stored = catalog.clone();
        Ok(())
    }

    fn load(&self) -> Result<StoredCatalog, PersistenceError> {
        let stored = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Ok(stored.clone())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut stored = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        *stored = StoredCatalog::default();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{PartItem, RepairItem};

    fn sample_catalog() -> StoredCatalog {
        let part = PartItem {
            repair_number: "100200".into(),
            part_number: "CAP455".into(),
            description: "RUN CAPACITOR 45/5 MFD".into(),
            manufacturer: "GEN".into(),
            manufacturer_part_number: "C455R".into(),
            vendor_id: "V01".into(),
            vendor_part_number: "VC-455".into(),
            cost: 12.5,
            quantity: 1,
            is_refrigerant: false,
        };
        let repair = RepairItem {
            repair_number: "100200".into(),
            group: "HVA".into(),
            subgroup: "ELE".into(),
            description: "REPLACE RUN CAPACITOR".into(),
            labor_time: 0.75,
            parts_cost: 12.5,
            regular_labor_cost: 71.25,
            associated_parts: vec![part.clone()],
        };
        StoredCatalog {
            vectors: vec![vec![0.1, 0.2, 0.3], vec![-1.0, 0.0, 0.5]],
            items: vec![CatalogItem::Repair(repair), CatalogItem::Part(part)],
            tiers: vec![MarkupTier::new(0.0, 50.0, 2.5), MarkupTier::new(50.01, 200.0, 1.8)],
            labor_rate: Some(95.0),
        }
    }

    #[test]
    fn lmdb_round_trip_preserves_order_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbCatalogStore::open(dir.path()).unwrap();
        let catalog = sample_catalog();

        store.save(&catalog).unwrap();
        assert_eq!(store.load().unwrap(), catalog);
    }

    #[test]
    fn lmdb_keeps_insertion_order_past_ten_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbCatalogStore::open(dir.path()).unwrap();
        let catalog = StoredCatalog {
            tiers: (0..25)
                .map(|i| MarkupTier::new(i as f64, i as f64 + 0.99, 1.0 + i as f64 / 100.0))
                .collect(),
            ..StoredCatalog::default()
        };

        store.save(&catalog).unwrap();
        assert_eq!(store.load().unwrap().tiers, catalog.tiers);
    }

    #[test]
    fn lmdb_save_replaces_previous_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbCatalogStore::open(dir.path()).unwrap();
        store.save(&sample_catalog()).unwrap();

        let smaller = StoredCatalog {
            vectors: vec![vec![1.0, 1.0, 1.0]],
            items: vec![sample_catalog().items[1].clone()],
            tiers: Vec::new(),
            labor_rate: None,
        };
        store.save(&smaller).unwrap();
        assert_eq!(store.load().unwrap(), smaller);
    }

    #[test]
    fn lmdb_empty_and_cleared_stores_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LmdbCatalogStore::open(dir.path()).unwrap();
        assert!(store.load().unwrap().is_empty());

        store.save(&sample_catalog()).unwrap();
        store.clear().unwrap();
        let loaded = store.load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.labor_rate, None);
    }

    #[test]
    fn lmdb_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LmdbCatalogStore::open(dir.path()).unwrap();
            store.save(&sample_catalog()).unwrap();
        }
        let store = LmdbCatalogStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), sample_catalog());
    }

    #[test]
    fn memory_store_round_trip_and_clear() {
        let store = MemoryCatalogStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&sample_catalog()).unwrap();
        assert_eq!(store.load().unwrap(), sample_catalog());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.backend_name(), "memory");
    }
}
