use crate::error::{Result, SchedulerError};
use std::str::FromStr;

/// Time unit for delay expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl FromStr for TimeUnit {
    type Err = SchedulerError;

    /// Parse a spelled-out unit, singular or plural, as used in delays like
    /// `"5 seconds"` or `"1 day"`. Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let unit = match name.strip_suffix('s').unwrap_or(name.as_str()) {
            "millisecond" => TimeUnit::Milliseconds,
            "second" => TimeUnit::Seconds,
            "minute" => TimeUnit::Minutes,
            "hour" => TimeUnit::Hours,
            "day" => TimeUnit::Days,
            _ => return Err(SchedulerError::InvalidDelay(s.to_string())),
        };
        Ok(unit)
    }
}

impl TimeUnit {
    /// Convert `value` of this unit to milliseconds, saturating at the i64 bounds.
    pub fn to_millis(&self, value: i64) -> i64 {
        let factor = match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        };
        value.saturating_mul(factor)
    }

    /// Parse a duration string like "5s", "10m", "2h", "500ms", "-200ms"
    /// Returns (value, TimeUnit) if successful
    ///
    /// Only lowercase suffixes are accepted, with no space between number and suffix.
    pub fn parse_duration(s: &str) -> Option<(i64, TimeUnit)> {
        let s = s.trim();
        let digits_from = usize::from(s.starts_with('-'));

        let split_pos = s[digits_from..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| i + digits_from)?;
        if split_pos == digits_from {
            return None;
        }

        let (num_str, unit_str) = s.split_at(split_pos);
        let value = num_str.parse::<i64>().ok()?;

        let time_unit = match unit_str {
            "ms" => TimeUnit::Milliseconds,
            "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "d" => TimeUnit::Days,
            _ => return None,
        };

        Some((value, time_unit))
    }
}

/// Parse an already-resolved delay expression into milliseconds.
///
/// Accepts shorthand durations (`"5s"`), spelled-out ones (`"5 seconds"`)
/// or a plain integer of milliseconds.
pub(crate) fn parse_delay_millis(s: &str) -> Result<i64> {
    if let Some((value, unit)) = TimeUnit::parse_duration(s) {
        return Ok(unit.to_millis(value));
    }

    let invalid = || SchedulerError::InvalidDelay(s.to_string());
    match s.trim().split_once(char::is_whitespace) {
        Some((value, unit)) => {
            let value = value.parse::<i64>().map_err(|_| invalid())?;
            let unit = unit.parse::<TimeUnit>().map_err(|_| invalid())?;
            Ok(unit.to_millis(value))
        }
        None => s.trim().parse::<i64>().map_err(|_| invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shorthand_suffixes() {
        assert_eq!(TimeUnit::parse_duration("500ms"), Some((500, TimeUnit::Milliseconds)));
        assert_eq!(TimeUnit::parse_duration("5s"), Some((5, TimeUnit::Seconds)));
        assert_eq!(TimeUnit::parse_duration(" 2m "), Some((2, TimeUnit::Minutes)));
        assert_eq!(TimeUnit::parse_duration("1h"), Some((1, TimeUnit::Hours)));
        assert_eq!(TimeUnit::parse_duration("3d"), Some((3, TimeUnit::Days)));
        assert_eq!(TimeUnit::parse_duration("-200ms"), Some((-200, TimeUnit::Milliseconds)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(TimeUnit::parse_duration("5S"), None);
        assert_eq!(TimeUnit::parse_duration("5 s"), None);
        assert_eq!(TimeUnit::parse_duration("ms"), None);
        assert_eq!(TimeUnit::parse_duration("-s"), None);
        assert_eq!(TimeUnit::parse_duration("1500"), None);
        assert_eq!(TimeUnit::parse_duration(""), None);
    }

    #[test]
    fn spelled_out_units_parse_singular_and_plural() {
        assert_eq!("Seconds".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert_eq!("day".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        assert_eq!("milliseconds".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert!(matches!("sec".parse::<TimeUnit>(), Err(SchedulerError::InvalidDelay(_))));
        assert!("s".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn to_millis_saturates() {
        assert_eq!(TimeUnit::Minutes.to_millis(2), 120_000);
        assert_eq!(TimeUnit::Days.to_millis(i64::MAX), i64::MAX);
        assert_eq!(TimeUnit::Days.to_millis(i64::MIN), i64::MIN);
    }

    #[test]
    fn delay_accepts_plain_millis() {
        assert_eq!(parse_delay_millis("1500").unwrap(), 1500);
        assert_eq!(parse_delay_millis("2s").unwrap(), 2000);
        assert_eq!(parse_delay_millis("-20").unwrap(), -20);
        assert_eq!(parse_delay_millis("5 seconds").unwrap(), 5_000);
        assert_eq!(parse_delay_millis(" 1 Minute ").unwrap(), 60_000);
        assert_eq!(parse_delay_millis("-250 milliseconds").unwrap(), -250);
        assert!(parse_delay_millis("5 fortnights").is_err());
        assert!(parse_delay_millis("five seconds").is_err());
        assert!(matches!(
            parse_delay_millis("soon"),
            Err(SchedulerError::InvalidDelay(s)) if s == "soon"
        ));
    }
}
