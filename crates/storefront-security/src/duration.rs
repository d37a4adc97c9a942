//! Human-readable duration parsing (`"4h"`, `"90 minutes"`, `"1.5d"`)

use crate::error::{Result, SecurityError};

const SECOND: f64 = 1000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

/// Longest input accepted
const MAX_INPUT_LEN: usize = 100;

fn unit_multiplier(unit: &str) -> Option<f64> {
    let unit = unit.to_ascii_lowercase();
    let multiplier = match unit.as_str() {
        // A bare number is milliseconds
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };
    Some(multiplier)
}

fn invalid(text: &str) -> SecurityError {
    SecurityError::ConfigurationError(format!("invalid duration: {:?}", text))
}

/// Resolve a duration string to whole milliseconds
///
/// # Errors
/// `ConfigurationError` for empty, over-long, negative or unparsable input,
/// or an unknown unit.
pub fn parse_duration(text: &str) -> Result<u64> {
    if text.len() > MAX_INPUT_LEN {
        return Err(invalid(text));
    }

    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let well_formed = number.ends_with(|c: char| c.is_ascii_digit())
        && number.matches('.').count() <= 1;
    if !well_formed {
        return Err(invalid(text));
    }

    let value: f64 = number.parse().map_err(|_| invalid(text))?;
    let multiplier = unit_multiplier(unit.trim_start()).ok_or_else(|| invalid(text))?;

    let millis = (value * multiplier).round();
    if !millis.is_finite() || millis >= u64::MAX as f64 {
        return Err(invalid(text));
    }

    Ok(millis as u64)
}
