//! Epoch-seconds timestamp conversion.

use chrono::{DateTime, Utc};

/// Substituted for timestamps that do not parse.
pub const EPOCH_START: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Parse decimal seconds since the Unix epoch (e.g. `1746038962.8603900`).
///
/// Whole seconds are the floor of the value; the fractional remainder is
/// truncated to milliseconds. Plain decimal text is converted exactly;
/// exponent notation goes through `f64`. Returns `None` for anything that is
/// not a finite number or falls outside chrono's range.
pub fn parse_epoch_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let millis = match decimal_millis(text) {
        Some(ms) => ms,
        None => float_millis(text)?,
    };
    DateTime::from_timestamp_millis(millis)
}

/// `floor(value * 1000)` computed on the digits.
fn decimal_millis(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let seconds: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let millis = frac
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0'));
    let magnitude = seconds.checked_mul(1000)?.checked_add(millis)?;
    if negative {
        // Anything below the millisecond pushes a negative value one step further down.
        let sub_milli = frac.bytes().skip(3).any(|b| b != b'0');
        magnitude.checked_neg()?.checked_sub(i64::from(sub_milli))
    } else {
        Some(magnitude)
    }
}

fn float_millis(text: &str) -> Option<i64> {
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let seconds = value.floor();
    let millis = ((value - seconds) * 1000.0).floor();
    let total = seconds * 1000.0 + millis;
    if total.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(total as i64)
}
