//! NF-e item taxes and document totals.
//!
//! Money is carried as `f64` at the edges and rounded half-up to cents
//! through `BigDecimal`, so `2.675` rounds to `2.68` rather than drifting.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use serde::Serialize;

use crate::status::TaxRegime;

fn decimal(value: f64) -> BigDecimal {
    if !value.is_finite() {
        return BigDecimal::from(0);
    }
    // Display gives the shortest representation that round-trips, which is
    // the value the user typed.
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

fn round_decimal(value: BigDecimal) -> f64 {
    let hundred = BigDecimal::from(100);
    let half = BigDecimal::new(5.into(), 1);
    let negative = value < BigDecimal::from(0);
    let scaled = value.abs() * &hundred + half;
    let cents = scaled.with_scale(0) / hundred;
    let rounded = cents.to_f64().unwrap_or(0.0);
    if negative {
        -rounded
    } else {
        rounded
    }
}

/// Rounds half-up (away from zero) to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    round_decimal(decimal(value))
}

/// `base * rate / 100`, rounded to cents.
pub fn tax_value(base: f64, rate: f64) -> f64 {
    round_decimal(decimal(base) * decimal(rate) / BigDecimal::from(100))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxRates {
    pub icms: f64,
    pub pis: f64,
    pub cofins: f64,
    pub ipi: f64,
}

/// Rates applied when an item does not carry its own.
pub fn default_rates(regime: TaxRegime, ipi: Option<f64>) -> TaxRates {
    match regime {
        // Simples Nacional collects through the DAS, nothing is highlighted on the item.
        TaxRegime::Simples => TaxRates { icms: 0.0, pis: 0.0, cofins: 0.0, ipi: 0.0 },
        TaxRegime::Presumido => TaxRates {
            icms: 18.0,
            pis: 0.65,
            cofins: 3.0,
            ipi: ipi.unwrap_or(0.0),
        },
        TaxRegime::Real => TaxRates {
            icms: 18.0,
            pis: 1.65,
            cofins: 7.6,
            ipi: ipi.unwrap_or(0.0),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLine {
    pub base: f64,
    pub rate: f64,
    pub value: f64,
}

impl TaxLine {
    pub fn new(base: f64, rate: f64) -> Self {
        TaxLine { base, rate, value: tax_value(base, rate) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemInput {
    pub quantity: f64,
    pub unit_price: f64,
    pub discount: f64,
    pub rates: TaxRates,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTaxes {
    pub total: f64,
    pub icms: TaxLine,
    pub pis: TaxLine,
    pub cofins: TaxLine,
    pub ipi: TaxLine,
}

/// Item total is `quantity * unit price - discount`; every tax uses it as base.
pub fn compute_item(input: &ItemInput) -> ItemTaxes {
    let gross = decimal(input.quantity) * decimal(input.unit_price);
    let total = round_decimal(gross - decimal(input.discount));
    ItemTaxes {
        total,
        icms: TaxLine::new(total, input.rates.icms),
        pis: TaxLine::new(total, input.rates.pis),
        cofins: TaxLine::new(total, input.rates.cofins),
        ipi: TaxLine::new(total, input.rates.ipi),
    }
}

/// Document-level charges that are not spread over items.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Charges {
    pub freight: f64,
    pub insurance: f64,
    pub other: f64,
    pub discount: f64,
    pub icms_st: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTotals {
    pub products: f64,
    pub icms: f64,
    pub pis: f64,
    pub cofins: f64,
    pub ipi: f64,
    pub total: f64,
}

/// `total = products + freight + insurance + other - discount + IPI + ICMS-ST`.
pub fn compute_totals<'a>(
    items: impl IntoIterator<Item = &'a ItemTaxes>,
    charges: &Charges,
) -> DocumentTotals {
    let zero = || BigDecimal::from(0);
    let (mut products, mut icms, mut pis, mut cofins, mut ipi) =
        (zero(), zero(), zero(), zero(), zero());
    for item in items {
        products += decimal(item.total);
        icms += decimal(item.icms.value);
        pis += decimal(item.pis.value);
        cofins += decimal(item.cofins.value);
        ipi += decimal(item.ipi.value);
    }
    let total = products.clone() + decimal(charges.freight) + decimal(charges.insurance)
        + decimal(charges.other)
        - decimal(charges.discount)
        + ipi.clone()
        + decimal(charges.icms_st);
    DocumentTotals {
        products: round_decimal(products),
        icms: round_decimal(icms),
        pis: round_decimal(pis),
        cofins: round_decimal(cofins),
        ipi: round_decimal(ipi),
        total: round_decimal(total),
    }
}
