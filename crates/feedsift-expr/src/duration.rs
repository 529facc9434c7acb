//! Parsing and formatting of duration strings.
//!
//! Durations use the Go/CEL notation: an optional sign followed by one or
//! more `<number><unit>` pairs, such as `2h`, `1h30m`, `2.5s` or `-300ms`.
//! Valid units are `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`.

use chrono::TimeDelta;
use thiserror::Error;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Error returned for malformed duration strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Parses a duration string such as `1h30m`.
///
/// # Errors
///
/// Returns a [`DurationError`] if the string is empty, uses an unknown unit,
/// or overflows the representable range.
pub fn parse_duration(input: &str) -> Result<TimeDelta, DurationError> {
    let fail = |reason| DurationError {
        input: input.to_string(),
        reason,
    };

    let (negative, mut rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(fail("empty duration"));
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, after) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(fail("expected a number"));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale = unit_scale(unit).ok_or_else(|| {
            if unit.is_empty() {
                fail("missing unit")
            } else {
                fail("unknown unit")
            }
        })?;

        total = total
            .checked_add(scaled(number, scale).ok_or_else(|| fail("value out of range"))?)
            .ok_or_else(|| fail("value out of range"))?;
        rest = after;
    }

    if negative {
        total = -total;
    }
    let nanos = i64::try_from(total).map_err(|_| fail("value out of range"))?;
    Ok(TimeDelta::nanoseconds(nanos))
}

/// Formats a duration the way CEL prints it: total seconds with an `s` suffix.
pub fn format_duration(duration: TimeDelta) -> String {
    let nanos = duration.num_nanoseconds().map(i128::from).unwrap_or_else(|| {
        i128::from(duration.num_seconds()) * NANOS_PER_SECOND
    });
    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.abs();
    let seconds = nanos / NANOS_PER_SECOND;
    let fraction = nanos % NANOS_PER_SECOND;
    if fraction == 0 {
        format!("{sign}{seconds}s")
    } else {
        let digits = format!("{:09}", fraction);
        format!("{sign}{seconds}.{}s", digits.trim_end_matches('0'))
    }
}

fn unit_scale(unit: &str) -> Option<i128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3_600 * NANOS_PER_SECOND),
        _ => None,
    }
}

/// Multiplies a decimal literal by a unit scale in nanoseconds.
fn scaled(number: &str, scale: i128) -> Option<i128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if fraction.contains('.') {
        return None;
    }

    let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;

    let mut divisor: i128 = 1;
    let mut fractional: i128 = 0;
    for digit in fraction.chars().take(18) {
        fractional = fractional * 10 + i128::from(digit.to_digit(10)?);
        divisor *= 10;
    }
    value = value.checked_add(fractional.checked_mul(scale)? / divisor)?;
    Some(value)
}
