// libs/worklist-cell/src/services/time_normalizer.rs
use chrono::{DateTime, NaiveDateTime, Timelike};
use serde_json::Value;

/// Returned for anything that cannot be read as a time of day.
pub const FALLBACK_TIME: &str = "00:00";

const ISO_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses the time encodings seen across backends into canonical `HH:mm`.
///
/// Bare numbers are read purely by magnitude: below 100 is minutes only,
/// 100..=999 is `HMM`, and 1000 or more is `HHMM`. `"0930"` is therefore
/// the number 930 and reads as 09:30.
pub struct TimeNormalizer;

impl TimeNormalizer {
    pub fn normalize(raw: &str) -> String {
        Self::try_normalize(raw).unwrap_or_else(|| FALLBACK_TIME.to_string())
    }

    pub fn normalize_value(value: &Value) -> String {
        let parsed = match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
                        .map(|n| n as u64)
                })
                .and_then(from_number),
            Value::String(text) => Self::try_normalize(text),
            _ => None,
        };
        parsed.unwrap_or_else(|| FALLBACK_TIME.to_string())
    }

    pub fn try_normalize(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return trimmed.parse::<u64>().ok().and_then(from_number);
        }

        if looks_like_datetime(trimmed) {
            return parse_iso(trimmed);
        }

        let upper = trimmed.to_ascii_uppercase();
        if let Some(clock) = upper.strip_suffix("AM") {
            return parse_clock(clock.trim()).and_then(|(h, m)| match h {
                12 => from_clock(0, m),
                1..=11 => from_clock(h, m),
                _ => None,
            });
        }
        if let Some(clock) = upper.strip_suffix("PM") {
            return parse_clock(clock.trim()).and_then(|(h, m)| match h {
                12 => from_clock(12, m),
                1..=11 => from_clock(h + 12, m),
                _ => None,
            });
        }

        parse_clock(trimmed).and_then(|(h, m)| from_clock(h, m))
    }
}

fn from_number(value: u64) -> Option<String> {
    if value < 100 {
        from_clock(0, value)
    } else {
        from_clock(value / 100, value % 100)
    }
}

fn from_clock(hours: u64, minutes: u64) -> Option<String> {
    if hours < 24 && minutes < 60 {
        Some(format!("{:02}:{:02}", hours, minutes))
    } else {
        None
    }
}

/// `H:mm`, `HH:mm` or `HH:mm:ss`.
fn parse_clock(text: &str) -> Option<(u64, u64)> {
    let parts: Vec<&str> = text.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let all_numeric = parts
        .iter()
        .all(|part| !part.is_empty() && part.len() <= 2 && part.chars().all(|c| c.is_ascii_digit()));
    if !all_numeric {
        return None;
    }

    let hours = parts[0].parse::<u64>().ok()?;
    let minutes = parts[1].parse::<u64>().ok()?;
    if let Some(seconds) = parts.get(2) {
        if seconds.parse::<u64>().ok()? >= 60 {
            return None;
        }
    }
    Some((hours, minutes))
}

fn looks_like_datetime(text: &str) -> bool {
    text.len() >= 16 && text.as_bytes()[4] == b'-' && (text.contains('T') || text.contains(' '))
}

fn parse_iso(text: &str) -> Option<String> {
    if let Ok(stamped) = DateTime::parse_from_rfc3339(text) {
        return from_clock(stamped.hour() as u64, stamped.minute() as u64);
    }
    ISO_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(|stamp| from_clock(stamp.hour() as u64, stamp.minute() as u64))
}
