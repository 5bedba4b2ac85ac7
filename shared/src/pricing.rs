//! Product cost simulation and supplier offer selection.

use serde::Serialize;

use crate::tax::round_cents;
use crate::RuleError;

/// Margin used when a product has never been priced.
pub const DEFAULT_MARGIN: f64 = 30.0;

/// One line of a product formula joined with its material's current price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLine {
    pub material_id: i32,
    pub name: String,
    pub unit: String,
    pub quantity_per_unit: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedMaterial {
    pub id: i32,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSimulation {
    pub quantity: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub fixed_cost: f64,
    pub overhead_cost: f64,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub margin: f64,
    pub suggested_price: f64,
    pub materials: Vec<SimulatedMaterial>,
}

/// Per-unit extras taken from the product's stored pricing, when requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extras {
    pub labor: Option<f64>,
    pub overhead: Option<f64>,
    pub fixed: Option<f64>,
}

/// Costs a production run of `quantity` units.
///
/// Material cost is reported per unit; `total_cost` covers the whole run and
/// the suggested price applies `margin` on top of the unit cost.
pub fn simulate(
    lines: &[MaterialLine],
    quantity: f64,
    extras: Extras,
    margin: f64,
) -> Result<PriceSimulation, RuleError> {
    if quantity <= 0.0 {
        return Err(RuleError::invalid("quantity must be greater than zero"));
    }
    if lines.is_empty() {
        return Err(RuleError::invalid("product has no formula to cost"));
    }

    let materials: Vec<SimulatedMaterial> = lines
        .iter()
        .map(|line| {
            let needed = line.quantity_per_unit * quantity;
            SimulatedMaterial {
                id: line.material_id,
                name: line.name.clone(),
                unit: line.unit.clone(),
                quantity: needed,
                unit_price: line.unit_price,
                total_price: round_cents(needed * line.unit_price),
            }
        })
        .collect();

    let material_cost: f64 = lines.iter().map(|l| l.quantity_per_unit * l.unit_price).sum();
    let labor_cost = extras.labor.unwrap_or(0.0);
    let overhead_cost = extras.overhead.unwrap_or(0.0);
    let fixed_cost = extras.fixed.unwrap_or(0.0);
    let unit_cost = material_cost + labor_cost + overhead_cost + fixed_cost;

    Ok(PriceSimulation {
        quantity,
        material_cost: round_cents(material_cost),
        labor_cost,
        fixed_cost,
        overhead_cost,
        unit_cost: round_cents(unit_cost),
        total_cost: round_cents(unit_cost * quantity),
        margin,
        suggested_price: round_cents(unit_cost * (1.0 + margin / 100.0)),
        materials,
    })
}

/// Stored pricing figures recomputed from a fresh material cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingFigures {
    pub total_cost: f64,
    pub suggested_price: f64,
}

pub fn recompute_pricing(
    material_cost: f64,
    labor: f64,
    overhead: f64,
    freight: f64,
    taxes: f64,
    profit_margin: f64,
) -> PricingFigures {
    let total_cost = round_cents(material_cost + labor + overhead + freight + taxes);
    PricingFigures {
        total_cost,
        suggested_price: round_cents(total_cost * (1.0 + profit_margin / 100.0)),
    }
}

/// Price of a supplier offer for a whole quotation item.
pub fn offer_total(unit_price: f64, quantity: f64, freight: f64, taxes: f64) -> f64 {
    round_cents(unit_price * quantity + freight + taxes)
}

/// Value of one sales order line.
pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    round_cents(quantity * unit_price)
}

pub fn order_total(lines: impl IntoIterator<Item = f64>) -> f64 {
    round_cents(lines.into_iter().sum())
}

#[derive(Debug, Clone, Copy)]
pub struct Offer {
    pub id: i32,
    pub total_price: f64,
    pub delivery_days: Option<i32>,
}

/// Cheapest offer; ties go to the faster delivery, then to the older offer.
pub fn best_offer(offers: &[Offer]) -> Option<i32> {
    offers
        .iter()
        .min_by(|a, b| {
            a.total_price
                .total_cmp(&b.total_price)
                .then_with(|| {
                    let days = |o: &Offer| o.delivery_days.unwrap_or(i32::MAX);
                    days(a).cmp(&days(b))
                })
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|o| o.id)
}
