use std::time::Duration;

use crate::errors::ConfigError;

/// Parse duration string (e.g., "90", "30s", "10m", "1h30m", "500ms").
///
/// A bare number is taken as seconds. Units may be chained, largest first or not.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let s = value.trim();
    let invalid = |reason: &str| ConfigError::Duration {
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    if s.is_empty() {
        return Err(invalid("duration string is empty"));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(invalid("expected a number"));
        }
        let num: u64 = rest[..digits]
            .parse()
            .map_err(|_| invalid("invalid duration number"))?;
        rest = &rest[digits..];

        let unit_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(num)),
            "s" => Some(Duration::from_secs(num)),
            "m" => num.checked_mul(60).map(Duration::from_secs),
            "h" => num.checked_mul(3600).map(Duration::from_secs),
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("invalid unit, use ms, s, m or h")),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| invalid("duration out of range"))?;
        rest = &rest[unit_len..];
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(" 1m30s ").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10").is_ok());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("1h30").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn rejects_out_of_range_durations() {
        assert!(matches!(
            parse_duration("9999999999999999999h"),
            Err(ConfigError::Duration { ref reason, .. }) if reason == "duration out of range"
        ));
        assert!(parse_duration("18446744073709551615s18446744073709551615s").is_err());
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615s").unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }
}
