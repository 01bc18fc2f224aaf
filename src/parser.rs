//! Fixed-width catalog exports.
//!
//! Column offsets are character positions. Lines shorter than a record's
//! minimum width are skipped.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::item::{MarkupTier, PartItem, RepairItem};

const REPAIR_LINE_WIDTH: usize = 82;
const PART_LINE_WIDTH: usize = 107;
const DEFAULT_REFRIGERANT_COST: f64 = 40.0;
const REFRIGERANT_MARKERS: [&str; 3] = ["refrigerant", "r-410a", "r410a"];

/// Raw records from one set of export files.
#[derive(Debug, Clone, Default)]
pub struct ParsedCatalog {
    pub repairs: Vec<RepairItem>,
    pub parts: Vec<PartItem>,
    pub tiers: Vec<MarkupTier>,
}

/// Reads an export file through a memory map. Invalid UTF-8 is replaced.
pub fn read_source(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(String::new());
    }

    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to map {}", path.display()))?;
    Ok(String::from_utf8_lossy(&mmap).into_owned())
}

/// Parses every repair file, then the parts and markup files.
pub fn load_catalog(repairs: &[PathBuf], parts: &Path, markup: &Path) -> Result<ParsedCatalog> {
    let mut catalog = ParsedCatalog::default();
    for path in repairs {
        let parsed = parse_repairs(&read_source(path)?);
        debug!(path = %path.display(), repairs = parsed.len(), "parsed repair file");
        catalog.repairs.extend(parsed);
    }
    catalog.parts = parse_parts(&read_source(parts)?);
    catalog.tiers = parse_markup(&read_source(markup)?);

    info!(
        repairs = catalog.repairs.len(),
        parts = catalog.parts.len(),
        tiers = catalog.tiers.len(),
        "catalog files parsed"
    );
    Ok(catalog)
}

/// `from [0,8)`, `through [9,17)`, `multiplier [18,26)`. Non-numeric lines
/// (headers, blanks) are skipped.
pub fn parse_markup(content: &str) -> Vec<MarkupTier> {
    content
        .lines()
        .filter_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            let from_cost = parse_number(&field(&chars, 0, 8))?;
            let through_cost = parse_number(&field(&chars, 9, 17))?;
            let multiplier = parse_number(&field(&chars, 18, 26))?;
            Some(MarkupTier::new(from_cost, through_cost, multiplier))
        })
        .collect()
}

pub fn parse_repairs(content: &str) -> Vec<RepairItem> {
    content
        .lines()
        .filter_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() < REPAIR_LINE_WIDTH {
                return None;
            }
            let repair_number = field(&chars, 0, 6);
            let description = field(&chars, 15, 60);
            if repair_number.is_empty() || description.is_empty() {
                return None;
            }
            Some(RepairItem {
                repair_number,
                group: field(&chars, 7, 10),
                subgroup: field(&chars, 11, 14),
                description,
                labor_time: parse_number(&field(&chars, 61, 66)).unwrap_or(0.0),
                parts_cost: parse_number(&field(&chars, 67, 74)).unwrap_or(0.0),
                regular_labor_cost: parse_number(&field(&chars, 75, 82)).unwrap_or(0.0),
                associated_parts: Vec::new(),
            })
        })
        .collect()
}

pub fn parse_parts(content: &str) -> Vec<PartItem> {
    content
        .lines()
        .filter_map(|line| {
            let chars: Vec<char> = line.chars().collect();
            if chars.len() < PART_LINE_WIDTH {
                return None;
            }

            let description = field(&chars, 14, 44);
            let is_refrigerant = is_refrigerant(&description);
            let cost_field = field(&chars, 95, 102);
            let cost = if cost_field.is_empty() && is_refrigerant {
                DEFAULT_REFRIGERANT_COST
            } else {
                parse_number(&cost_field).unwrap_or(0.0)
            };
            let quantity = parse_number(&field(&chars, 103, 107))
                .filter(|q| *q >= 1.0 && *q <= u32::MAX as f64)
                .map_or(1, |q| q as u32);

            Some(PartItem {
                repair_number: field(&chars, 0, 6),
                part_number: field(&chars, 7, 13),
                description,
                manufacturer: field(&chars, 45, 48),
                manufacturer_part_number: field(&chars, 49, 69),
                vendor_id: field(&chars, 70, 73),
                vendor_part_number: field(&chars, 74, 94),
                cost,
                quantity,
                is_refrigerant,
            })
        })
        .collect()
}

pub fn is_refrigerant(description: &str) -> bool {
    let lowered = description.to_lowercase();
    REFRIGERANT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn field(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect::<String>().trim().to_string()
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}
