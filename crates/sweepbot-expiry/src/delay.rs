//! Delay-token parsing for scheduled deletions.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<number><unit>` where unit is d (days), h (hours) or m (minutes) and
/// the number is a non-negative decimal.
static DELAY_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d*\.?\d+)([dhm])$").expect("delay token regex"));

/// Bounds for user-supplied deletion delays.
///
/// The ceiling (240 h = 10 days in the shipped policy) keeps a user from
/// scheduling a deletion years out and leaving a record alive
/// indefinitely.
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    pub default_hours: f64,
    pub max_hours: f64,
}

impl DelayPolicy {
    pub fn new(default_hours: f64, max_hours: f64) -> Self {
        Self {
            default_hours,
            max_hours,
        }
    }

    /// Resolve a raw delay token ("2d", "1.5h", "30m") into hours.
    ///
    /// Malformed or out-of-range tokens fall back to the default silently.
    /// Bad input never blocks the command; this is a product decision, not
    /// an oversight.
    pub fn resolve(&self, raw: Option<&str>) -> f64 {
        let Some(raw) = raw else {
            return self.default_hours;
        };
        let Some(caps) = DELAY_TOKEN.captures(raw) else {
            return self.default_hours;
        };
        let Ok(value) = caps[1].parse::<f64>() else {
            return self.default_hours;
        };
        let hours = match &caps[2] {
            "d" => value * 24.0,
            "m" => value / 60.0,
            _ => value,
        };
        if hours > 0.0 && hours <= self.max_hours {
            hours
        } else {
            self.default_hours
        }
    }
}
