use std::collections::HashMap;

use chrono::NaiveDate;

use crate::RuleError;

pub fn check_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), RuleError> {
    if end < start {
        return Err(RuleError::invalid("end date must not be before start date"));
    }
    Ok(())
}

/// Inclusive on both ends: a leave ending on the day another starts overlaps it.
pub fn ranges_overlap(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Whether making `parent` the parent of `department` would close a loop.
/// `parents` maps each department to its current parent.
pub fn creates_cycle(department: i32, parent: i32, parents: &HashMap<i32, Option<i32>>) -> bool {
    let mut current = Some(parent);
    let mut steps = 0;
    while let Some(id) = current {
        if id == department {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            // already looping without passing through `department`
            return true;
        }
        current = parents.get(&id).copied().flatten();
    }
    false
}

pub fn check_salary_range(min: Option<f64>, max: Option<f64>) -> Result<(), RuleError> {
    match (min, max) {
        (Some(min), _) if min < 0.0 => Err(RuleError::invalid("salary range must not be negative")),
        (Some(min), Some(max)) if min > max => {
            Err(RuleError::invalid("salary range minimum exceeds maximum"))
        }
        _ => Ok(()),
    }
}
