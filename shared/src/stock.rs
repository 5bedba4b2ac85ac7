//! Raw material stock movements.

use crate::status::TransactionType;
use crate::RuleError;

/// Stock after a movement. Quantities are positive; the type gives the
/// direction. Stock never goes below zero.
pub fn apply_movement(current: f64, kind: TransactionType, quantity: f64) -> Result<f64, RuleError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(RuleError::invalid("quantity must be greater than zero"));
    }
    match kind {
        TransactionType::In => Ok(current + quantity),
        TransactionType::Out if quantity > current => Err(RuleError::invalid(format!(
            "insufficient stock: {current} available, {quantity} requested"
        ))),
        TransactionType::Out => Ok(current - quantity),
    }
}

/// Below the minimum, not at it.
pub fn is_low(current: f64, minimum: f64) -> bool {
    current < minimum
}
