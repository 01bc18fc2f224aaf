use crate::config::Number;
use serde::{Deserialize, Serialize};

/// A unit of retrieval and pricing. The variant is fixed at parse time.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CatalogItem {
    Repair(RepairItem),
    Part(PartItem),
}

impl CatalogItem {
    pub fn description(&self) -> &str {
        match self {
            CatalogItem::Repair(repair) => &repair.description,
            CatalogItem::Part(part) => &part.description,
        }
    }

    /// Repair number for repairs, part number for parts.
    pub fn number(&self) -> &str {
        match self {
            CatalogItem::Repair(repair) => &repair.repair_number,
            CatalogItem::Part(part) => &part.part_number,
        }
    }

    pub fn is_repair(&self) -> bool {
        matches!(self, CatalogItem::Repair(_))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RepairItem {
    pub repair_number: String,
    pub group: String,
    pub subgroup: String,
    pub description: String,
    /// Hours.
    pub labor_time: f64,
    pub parts_cost: f64,
    pub regular_labor_cost: f64,
    pub associated_parts: Vec<PartItem>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PartItem {
    pub repair_number: String,
    pub part_number: String,
    pub description: String,
    pub manufacturer: String,
    pub manufacturer_part_number: String,
    pub vendor_id: String,
    pub vendor_part_number: String,
    pub cost: f64,
    pub quantity: u32,
    pub is_refrigerant: bool,
}

/// Cost band `[from_cost, through_cost]` (inclusive both ends) mapped to a multiplier.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MarkupTier {
    pub from_cost: f64,
    pub through_cost: f64,
    pub multiplier: f64,
}

impl MarkupTier {
    pub fn new(from_cost: f64, through_cost: f64, multiplier: f64) -> Self {
        Self {
            from_cost,
            through_cost,
            multiplier,
        }
    }

    pub fn contains(&self, cost: f64) -> bool {
        self.from_cost <= cost && cost <= self.through_cost
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct SearchHit {
    pub item: CatalogItem,
    /// Cosine similarity in `[-1, 1]`.
    pub score: Number,
}
