//! Brazilian document numbers: CPF, CNPJ, UF codes, NCM, CFOP and the
//! 44-digit NF-e access key.

use chrono::{Datelike, NaiveDate};

use crate::status::CfopDirection;
use crate::RuleError;

/// IBGE state codes, as used in the first two digits of an access key.
const UF_CODES: &[(&str, u8)] = &[
    ("RO", 11), ("AC", 12), ("AM", 13), ("RR", 14), ("PA", 15), ("AP", 16), ("TO", 17),
    ("MA", 21), ("PI", 22), ("CE", 23), ("RN", 24), ("PB", 25), ("PE", 26), ("AL", 27),
    ("SE", 28), ("BA", 29), ("MG", 31), ("ES", 32), ("RJ", 33), ("SP", 35), ("PR", 41),
    ("SC", 42), ("RS", 43), ("MS", 50), ("MT", 51), ("GO", 52), ("DF", 53),
];

pub const ACCESS_KEY_LEN: usize = 44;

pub fn only_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn digits_of(input: &str) -> Vec<u32> {
    input.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Mod-11 check digit where a remainder below 2 maps to 0.
fn mod11_digit(digits: &[u32], weights: impl Iterator<Item = u32>) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

/// Validates a CPF and returns its 11 digits without punctuation.
pub fn validate_cpf(input: &str) -> Result<String, RuleError> {
    let digits = digits_of(input);
    if digits.len() != 11 || all_same(&digits) {
        return Err(RuleError::InvalidCpf);
    }
    let first = mod11_digit(&digits[..9], (2..=10).rev());
    let second = mod11_digit(&digits[..10], (2..=11).rev());
    if digits[9] != first || digits[10] != second {
        return Err(RuleError::InvalidCpf);
    }
    Ok(only_digits(input))
}

/// Validates a CNPJ and returns its 14 digits without punctuation.
pub fn validate_cnpj(input: &str) -> Result<String, RuleError> {
    const WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let digits = digits_of(input);
    if digits.len() != 14 || all_same(&digits) {
        return Err(RuleError::InvalidCnpj);
    }
    let first = mod11_digit(&digits[..12], WEIGHTS[1..].iter().copied());
    let second = mod11_digit(&digits[..13], WEIGHTS.iter().copied());
    if digits[12] != first || digits[13] != second {
        return Err(RuleError::InvalidCnpj);
    }
    Ok(only_digits(input))
}

/// Accepts either a CPF or a CNPJ, chosen by digit count.
pub fn validate_tax_id(input: &str) -> Result<String, RuleError> {
    match only_digits(input).len() {
        11 => validate_cpf(input),
        14 => validate_cnpj(input),
        _ => Err(RuleError::invalid("tax id must be a CPF or a CNPJ")),
    }
}

pub fn uf_code(uf: &str) -> Result<u8, RuleError> {
    let wanted = uf.trim().to_ascii_uppercase();
    UF_CODES
        .iter()
        .find(|(sigla, _)| *sigla == wanted)
        .map(|(_, code)| *code)
        .ok_or_else(|| RuleError::UnknownUf(uf.to_string()))
}

/// Accepts dotted input (`8471.30.12`) and returns the 8 bare digits.
pub fn validate_ncm(input: &str) -> Result<String, RuleError> {
    let digits = only_digits(input);
    if digits.len() != 8 || input.chars().any(|c| !c.is_ascii_digit() && c != '.') {
        return Err(RuleError::InvalidNcm);
    }
    Ok(digits)
}

/// Direction of a CFOP code: 1xxx-3xxx are inbound, 5xxx-7xxx outbound.
pub fn cfop_direction(code: &str) -> Result<CfopDirection, RuleError> {
    let digits = only_digits(code);
    if digits.len() != 4 || digits.len() != code.trim().chars().filter(|c| *c != '.').count() {
        return Err(RuleError::InvalidCfop(format!("'{code}' must have 4 digits")));
    }
    match digits.as_bytes()[0] {
        b'1'..=b'3' => Ok(CfopDirection::Inbound),
        b'5'..=b'7' => Ok(CfopDirection::Outbound),
        _ => Err(RuleError::InvalidCfop(format!("'{code}' has no valid direction"))),
    }
}

/// Fields packed into an NF-e access key.
#[derive(Debug, Clone)]
pub struct AccessKeyParts<'a> {
    pub uf: &'a str,
    pub issued_on: NaiveDate,
    pub cnpj: &'a str,
    pub model: u32,
    pub series: u32,
    pub number: u32,
    pub emission_type: u32,
    pub numeric_code: u32,
}

/// Builds `cUF AAMM CNPJ mod serie nNF tpEmis cNF DV`.
pub fn build_access_key(parts: &AccessKeyParts<'_>) -> Result<String, RuleError> {
    let uf = uf_code(parts.uf)?;
    let cnpj = only_digits(parts.cnpj);
    if cnpj.len() != 14 {
        return Err(RuleError::InvalidAccessKey("issuer CNPJ must have 14 digits".into()));
    }
    if parts.series > 999 || parts.number > 999_999_999 || parts.numeric_code > 99_999_999 {
        return Err(RuleError::InvalidAccessKey("series, number or code out of range".into()));
    }
    let body = format!(
        "{uf:02}{yy:02}{mm:02}{cnpj}{model:02}{series:03}{number:09}{tp}{code:08}",
        yy = parts.issued_on.year() % 100,
        mm = parts.issued_on.month(),
        model = parts.model,
        series = parts.series,
        number = parts.number,
        tp = parts.emission_type,
        code = parts.numeric_code,
    );
    let dv = access_key_check_digit(&body)?;
    Ok(format!("{body}{dv}"))
}

/// Check digit over the first 43 digits, weights 2..=9 cycling from the right.
pub fn access_key_check_digit(body: &str) -> Result<u32, RuleError> {
    let digits = digits_of(body);
    if digits.len() != ACCESS_KEY_LEN - 1 || digits.len() != body.len() {
        return Err(RuleError::InvalidAccessKey("body must have 43 digits".into()));
    }
    let reversed: Vec<u32> = digits.into_iter().rev().collect();
    Ok(mod11_digit(&reversed, (2..=9).cycle()))
}

pub fn is_valid_access_key(key: &str) -> bool {
    if key.len() != ACCESS_KEY_LEN || !key.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let (body, dv) = key.split_at(ACCESS_KEY_LEN - 1);
    match access_key_check_digit(body) {
        Ok(expected) => dv.parse::<u32>().map(|d| d == expected).unwrap_or(false),
        Err(_) => false,
    }
}
