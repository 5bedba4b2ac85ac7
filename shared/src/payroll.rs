//! Monthly payroll arithmetic with the 2024 INSS and IRRF tables.

use serde::Serialize;

use crate::tax::round_cents;

/// Upper bound of each INSS bracket and the rate applied to the slice below it.
const INSS_BRACKETS: [(f64, f64); 4] = [
    (1412.00, 7.5),
    (2666.68, 9.0),
    (4000.03, 12.0),
    (7786.02, 14.0),
];

/// IRRF brackets as (upper bound, rate, deduction). The last one is open-ended.
const IRRF_BRACKETS: [(f64, f64, f64); 5] = [
    (2259.20, 0.0, 0.0),
    (2826.65, 7.5, 169.44),
    (3751.05, 15.0, 381.44),
    (4664.68, 22.5, 662.77),
    (f64::INFINITY, 27.5, 896.00),
];

pub const FGTS_RATE: f64 = 8.0;

/// Progressive INSS contribution, capped at the ceiling of the last bracket.
pub fn inss(gross: f64) -> f64 {
    let mut lower = 0.0;
    let mut total = 0.0;
    for (upper, rate) in INSS_BRACKETS {
        if gross <= lower {
            break;
        }
        total += (gross.min(upper) - lower) * rate / 100.0;
        lower = upper;
    }
    round_cents(total)
}

/// IRRF withheld on `base`, which is gross pay minus INSS.
pub fn irrf(base: f64) -> f64 {
    let (_, rate, deduction) = IRRF_BRACKETS
        .iter()
        .copied()
        .find(|(upper, _, _)| base <= *upper)
        .unwrap_or(IRRF_BRACKETS[IRRF_BRACKETS.len() - 1]);
    round_cents((base * rate / 100.0 - deduction).max(0.0))
}

pub fn fgts(gross: f64) -> f64 {
    round_cents(gross * FGTS_RATE / 100.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PayrollInput {
    pub base_salary: f64,
    pub bonuses: f64,
    pub benefits: f64,
    pub deductions: f64,
    pub inss: Option<f64>,
    pub irrf: Option<f64>,
    pub fgts: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBreakdown {
    pub gross_salary: f64,
    pub net_salary: f64,
    pub inss: f64,
    pub irrf: f64,
    pub fgts: f64,
}

/// Derives gross and net pay. Withholdings that were given explicitly are
/// kept, the rest come from the tables.
pub fn compute(input: &PayrollInput) -> PayrollBreakdown {
    let gross = round_cents(input.base_salary + input.bonuses + input.benefits);
    let inss = input.inss.unwrap_or_else(|| inss(gross));
    let irrf = input.irrf.unwrap_or_else(|| irrf(gross - inss));
    let fgts = input.fgts.unwrap_or_else(|| fgts(gross));
    let net = round_cents(gross - inss - irrf - input.deductions);
    PayrollBreakdown { gross_salary: gross, net_salary: net, inss, irrf, fgts }
}
