// 🔢 Scalar Coercion - Best-effort conversion of loose API values
//
// Fleetio sends numbers as numbers, numbers as strings, and sometimes
// free text where a number should be. Anything that cannot be converted
// counts as absent and stores as NULL.

use serde_json::Value;

/// Convert an arbitrary JSON scalar to an integer.
///
/// Integers pass through, floats truncate toward zero, and numeric
/// strings (integer or float form) parse the same way. Text, blank
/// strings, null, absent values, and anything outside the `i64` range
/// all yield `None`. Never errors.
pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
        }
        _ => None,
    }
}

/// Convert an arbitrary JSON scalar to display text.
///
/// Strings are trimmed (blank becomes `None`); numbers render as their
/// decimal text, so a numeric custom field still resolves like the
/// string form. Other shapes yield `None`.
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    // i64::MAX is not exactly representable as f64; the exclusive upper
    // bound 2^63 is.
    if t >= -(2f64.powi(63)) && t < 2f64.powi(63) {
        Some(t as i64)
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
