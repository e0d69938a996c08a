//! # Result oracle
//!
//! Compares the expected outcome of a scenario against the final values a
//! run produced. Comparison is by set equality over device identifiers,
//! and per identifier either direct value equality or structural
//! equivalence between lists and tuples (recursive, element-wise; `Null`
//! matches only `Null`). All mismatches are collected and reported as one
//! aggregate error, never one at a time.

use std::collections::HashMap;
use std::fmt::Write as _;

use swarmsim_types::{DeviceId, Value};

/// One disagreement between expected and actual results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Mismatch {
    #[error("device {device}: expected but absent from actual results")]
    Missing { device: DeviceId },

    #[error("device {device}: present in actual results but not expected")]
    Unexpected { device: DeviceId },

    #[error("device {device}: expected {expected:?}, got {actual:?}")]
    Value {
        device: DeviceId,
        expected: Value,
        actual: Value,
    },
}

/// Aggregate comparison failure enumerating every mismatch.
#[derive(Debug, thiserror::Error)]
#[error("expected and actual results disagree:{report}")]
pub struct OracleError {
    report: String,
    pub mismatches: Vec<Mismatch>,
}

impl OracleError {
    fn new(mismatches: Vec<Mismatch>) -> Self {
        let mut report = String::new();
        for mismatch in &mismatches {
            let _ = write!(report, "\n  {mismatch}");
        }
        Self { report, mismatches }
    }
}

/// Direct equality, or element-wise structural equivalence when one side
/// is a list and the other a tuple.
fn values_match(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (expected, actual) {
        (Value::List(a) | Value::Tuple(a), Value::List(b) | Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_match(x, y))
        }
        _ => false,
    }
}

/// Checks a run's final values against the expected outcome.
pub fn compare_results(
    expected: &[(DeviceId, Value)],
    actual: &HashMap<DeviceId, Value>,
) -> Result<(), OracleError> {
    let mut mismatches = Vec::new();

    for (device, expected_value) in expected {
        match actual.get(device) {
            None => mismatches.push(Mismatch::Missing {
                device: device.clone(),
            }),
            Some(actual_value) if !values_match(expected_value, actual_value) => {
                mismatches.push(Mismatch::Value {
                    device: device.clone(),
                    expected: expected_value.clone(),
                    actual: actual_value.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for device in actual.keys() {
        if !expected.iter().any(|(d, _)| d == device) {
            mismatches.push(Mismatch::Unexpected {
                device: device.clone(),
            });
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(OracleError::new(mismatches))
    }
}
