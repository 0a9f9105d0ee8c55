//! Duration strings for proxy parameters: `30s`, `5m`, `1h30m`, `2d`, `1w`.
//!
//! Supported units are `ms`, `s`, `m`, `h`, `d` and `w`. Components can be
//! chained and are summed; every number needs a unit.

use std::time::Duration;

use thiserror::Error;

/// Error type for duration parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration '{input}': {message}")]
pub struct DurationParseError {
    pub input: String,
    pub message: String,
}

impl DurationParseError {
    fn new(input: &str, message: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

fn unit_millis(unit: &str) -> Option<u64> {
    let millis = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 604_800_000,
        _ => return None,
    };
    Some(millis)
}

/// Parses a duration such as `90s` or `1h30m`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hostmetrics::util::parse_duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("10").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::new(input, "empty duration"));
    }

    let mut total: u64 = 0;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(DurationParseError::new(input, "expected a number"));
        }
        let number: u64 = rest[..digits_end]
            .parse()
            .map_err(|_| DurationParseError::new(input, "number out of range"))?;
        rest = &rest[digits_end..];

        let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        if unit.is_empty() {
            return Err(DurationParseError::new(input, "missing unit"));
        }
        let per_unit = unit_millis(unit).ok_or_else(|| {
            DurationParseError::new(input, format!("unknown unit '{unit}', use ms, s, m, h, d or w"))
        })?;
        rest = &rest[unit_end..];

        total = number
            .checked_mul(per_unit)
            .and_then(|millis| total.checked_add(millis))
            .ok_or_else(|| DurationParseError::new(input, "duration overflow"))?;
    }

    Ok(Duration::from_millis(total))
}
