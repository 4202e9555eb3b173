//! Scalar coercion for provider values.
//!
//! The data service reports cells as loosely-typed JSON: durations may arrive
//! as clock strings or plain numbers, numbers as floats or numeric strings,
//! and "no data" as null or one of several textual NA markers. Everything
//! here converts to a normalized value or `None`, never an error.

use regex::Regex;
use serde_json::Value;

/// Textual markers the provider emits for missing data.
const NA_MARKERS: [&str; 5] = ["NaN", "nan", "NaT", "None", "<NA>"];

/// True when a cell carries no usable value: absent column, JSON null,
/// or one of the provider's NA markers (including the empty string).
pub fn is_missing(cell: Option<&Value>) -> bool {
    match cell {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.is_empty() || NA_MARKERS.contains(&s)
        }
        Some(_) => false,
    }
}

/// Coerce a duration-like cell to seconds.
///
/// Accepts plain numbers, numeric strings, and clock strings in the forms
/// the provider uses for lap and qualifying times: `M:SS.fff`,
/// `H:MM:SS.ffffff`, and the long-form `D days H:MM:SS.ffffff`.
pub fn to_seconds(cell: Option<&Value>) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    match cell? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<f64>() {
                return Some(v);
            }
            parse_clock(s)
        }
        _ => None,
    }
}

/// Coerce an integer-like cell. Floats truncate (positions arrive as `1.0`).
pub fn to_int(cell: Option<&Value>) -> Option<i64> {
    if is_missing(cell) {
        return None;
    }
    match cell? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Some(v);
            }
            s.parse::<f64>().ok().map(|f| f as i64)
        }
        _ => None,
    }
}

/// Coerce a string-like cell. Trims, and treats the empty result as absent.
pub fn to_str(cell: Option<&Value>) -> Option<String> {
    if is_missing(cell) {
        return None;
    }
    match cell? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a clock-format duration string to total seconds.
fn parse_clock(s: &str) -> Option<f64> {
    // D days H:MM:SS.ffffff (long form) or H:MM:SS.ffffff
    let long_re = Regex::new(r"^(?:(\d+)\s+days?\s+)?(\d+):(\d{2}):(\d{2})(?:\.(\d+))?$").unwrap();
    if let Some(caps) = long_re.captures(s) {
        let days: f64 = caps.get(1).map_or(0.0, |m| m.as_str().parse().unwrap_or(0.0));
        let hours: f64 = caps[2].parse().ok()?;
        let minutes: f64 = caps[3].parse().ok()?;
        let seconds: f64 = caps[4].parse().ok()?;
        let frac = caps.get(5).map_or(0.0, |m| fraction(m.as_str()));
        return Some(days * 86400.0 + hours * 3600.0 + minutes * 60.0 + seconds + frac);
    }

    // M:SS.fff (lap-time form)
    let short_re = Regex::new(r"^(\d+):(\d{2})(?:\.(\d+))?$").unwrap();
    if let Some(caps) = short_re.captures(s) {
        let minutes: f64 = caps[1].parse().ok()?;
        let seconds: f64 = caps[2].parse().ok()?;
        let frac = caps.get(3).map_or(0.0, |m| fraction(m.as_str()));
        return Some(minutes * 60.0 + seconds + frac);
    }

    None
}

/// Digits after the decimal point to a fractional value.
fn fraction(digits: &str) -> f64 {
    digits
        .parse::<f64>()
        .map(|v| v / 10f64.powi(digits.len() as i32))
        .unwrap_or(0.0)
}
