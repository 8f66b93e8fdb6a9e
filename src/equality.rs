//! Cell equality with numeric tolerance

use crate::model::{DataType, Value};

/// Default absolute tolerance for numeric columns
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Decide whether two cell values match.
///
/// Numeric semantic types compare numbers within `tolerance`; everything else is
/// strict equality. Numbers are compared by value, so `1` and `1.0` are the same cell.
pub fn values_equal(a: &Value, b: &Value, semantic_type: DataType, tolerance: f64) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) if semantic_type.is_numeric() => (x - y).abs() <= tolerance,
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}
