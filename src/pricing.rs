//! Tiered markup and labor pricing for matched catalog items.

use serde::Serialize;
use tracing::{debug, warn};

use crate::item::{CatalogItem, MarkupTier, PartItem};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedItem {
    pub total: f64,
    pub breakdown: PriceBreakdown,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceBreakdown {
    /// Present for repairs only.
    pub labor_cost: Option<f64>,
    pub parts_total: f64,
    pub parts: Vec<PartLine>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PartLine {
    pub part_number: String,
    pub quantity: u32,
    pub base_cost: f64,
    pub marked_up_cost: f64,
    pub extended_cost: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    tiers: Vec<MarkupTier>,
    labor_rate: f64,
}

impl PricingEngine {
    pub fn new(tiers: Vec<MarkupTier>, labor_rate: f64) -> Self {
        Self { tiers, labor_rate }
    }

    pub fn tiers(&self) -> &[MarkupTier] {
        &self.tiers
    }

    pub fn labor_rate(&self) -> f64 {
        self.labor_rate
    }

    pub fn replace(&mut self, tiers: Vec<MarkupTier>, labor_rate: f64) {
        self.tiers = tiers;
        self.labor_rate = labor_rate;
    }

    pub fn clear(&mut self) {
        self.tiers.clear();
        self.labor_rate = 0.0;
    }

    /// Tiers present and a positive labor rate.
    pub fn is_configured(&self) -> bool {
        !self.tiers.is_empty() && self.labor_rate.is_finite() && self.labor_rate > 0.0
    }

    /// Applies the first tier (in stored order) whose band contains the cost
    /// rounded to cents. Costs outside every tier are returned unmarked.
    pub fn calculate_markup(&self, cost: f64) -> f64 {
        if cost.is_nan() || cost <= 0.0 {
            return 0.0;
        }

        let fixed_cost = round_cents(cost);
        match self.tiers.iter().find(|tier| tier.contains(fixed_cost)) {
            Some(tier) => {
                let marked_up = fixed_cost * tier.multiplier;
                debug!(cost = fixed_cost, multiplier = tier.multiplier, marked_up, "applied markup");
                marked_up
            }
            None => {
                warn!(cost = fixed_cost, "no markup range found for cost");
                fixed_cost
            }
        }
    }

    pub fn calculate_total(&self, item: &CatalogItem) -> f64 {
        self.price_item(item).total
    }

    pub fn price_item(&self, item: &CatalogItem) -> PricedItem {
        match item {
            CatalogItem::Repair(repair) => {
                let labor_cost = finite_or_zero(repair.labor_time) * self.labor_rate;
                let (parts_total, parts) = if repair.associated_parts.is_empty() {
                    (self.calculate_markup(finite_or_zero(repair.parts_cost)), Vec::new())
                } else {
                    let lines: Vec<PartLine> = repair
                        .associated_parts
                        .iter()
                        .map(|part| self.part_line(part, part.quantity))
                        .collect();
                    (lines.iter().map(|line| line.extended_cost).sum(), lines)
                };

                let total = labor_cost + parts_total;
                debug!(
                    repair = %repair.repair_number,
                    labor_cost,
                    parts_total,
                    total,
                    "priced repair"
                );
                PricedItem {
                    total,
                    breakdown: PriceBreakdown {
                        labor_cost: Some(labor_cost),
                        parts_total,
                        parts,
                    },
                }
            }
            // A standalone part is quoted per unit.
            CatalogItem::Part(part) => {
                let line = self.part_line(part, 1);
                PricedItem {
                    total: line.marked_up_cost,
                    breakdown: PriceBreakdown {
                        labor_cost: None,
                        parts_total: line.marked_up_cost,
                        parts: vec![line],
                    },
                }
            }
        }
    }

    fn part_line(&self, part: &PartItem, quantity: u32) -> PartLine {
        let base_cost = finite_or_zero(part.cost);
        let quantity = quantity.max(1);
        let marked_up_cost = self.calculate_markup(base_cost);
        PartLine {
            part_number: part.part_number.clone(),
            quantity,
            base_cost,
            marked_up_cost,
            extended_cost: marked_up_cost * quantity as f64,
        }
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// US-dollar formatting with thousands separators, e.g. `$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let amount = finite_or_zero(amount);
    let total_cents = (amount.abs() * 100.0).round() as u64;
    let (dollars, cents) = (total_cents / 100, total_cents % 100);

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && total_cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents:02}")
}
