//! Business rules shared by the CustoSmart services.
//!
//! Everything in here is pure: no I/O, no clocks unless a date is passed in.
//! The HTTP layer in `erp-service` validates requests and derives computed
//! fields by calling into these modules.

use thiserror::Error;

mod text_enum;

pub mod codes;
pub mod documents;
pub mod hr;
pub mod pagination;
pub mod payroll;
pub mod permissions;
pub mod pricing;
pub mod status;
pub mod stock;
pub mod tax;

pub use pagination::{Page, Paginated};
pub use permissions::Module;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("invalid value '{value}' for {kind}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("invalid CPF")]
    InvalidCpf,

    #[error("invalid CNPJ")]
    InvalidCnpj,

    #[error("unknown UF '{0}'")]
    UnknownUf(String),

    #[error("NCM must have 8 digits")]
    InvalidNcm,

    #[error("invalid CFOP: {0}")]
    InvalidCfop(String),

    #[error("invalid access key: {0}")]
    InvalidAccessKey(String),

    #[error("cannot move from '{from}' to '{to}'")]
    Transition { from: &'static str, to: &'static str },

    #[error("{0}")]
    Invalid(String),
}

impl RuleError {
    pub fn invalid(message: impl Into<String>) -> Self {
        RuleError::Invalid(message.into())
    }
}
