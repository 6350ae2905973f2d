//! Rest timer helpers
//!
//! Rest targets in the program are free text ("~2 min", "90 sec", "0").

use std::sync::LazyLock;

use regex::Regex;

/// Used when the rest target is missing or unreadable
pub const DEFAULT_REST_SECS: u32 = 90;

static MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*(min|mins|minute|minutes)").unwrap());
static SECONDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*(s|sec|secs|second|seconds)").unwrap());

/// Turn a rest target into seconds
pub fn parse_rest_seconds(rest_target: Option<&str>) -> u32 {
    let Some(target) = rest_target else {
        return DEFAULT_REST_SECS;
    };
    let s = target.trim().to_lowercase();
    if s.is_empty() {
        return DEFAULT_REST_SECS;
    }
    if s == "0" {
        return 0;
    }

    // also covers "0 min"
    if let Some(mins) = minutes(&s) {
        return mins;
    }
    if let Some(caps) = SECONDS_RE.captures(&s)
        && let Ok(n) = caps[1].parse::<u32>()
    {
        return n;
    }

    DEFAULT_REST_SECS
}

fn minutes(s: &str) -> Option<u32> {
    let caps = MINUTES_RE.captures(s)?;
    let mins: f64 = caps[1].parse().ok()?;
    mins.is_finite().then(|| (mins * 60.0).round().max(0.0) as u32)
}

/// `m:ss` clock text
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes() {
        assert_eq!(parse_rest_seconds(Some("~2 min")), 120);
        assert_eq!(parse_rest_seconds(Some("~1.5 mins")), 90);
        assert_eq!(parse_rest_seconds(Some("3 Minutes")), 180);
    }

    #[test]
    fn test_seconds() {
        assert_eq!(parse_rest_seconds(Some("90 sec")), 90);
        assert_eq!(parse_rest_seconds(Some("45s")), 45);
    }

    #[test]
    fn test_zero() {
        assert_eq!(parse_rest_seconds(Some("0")), 0);
        assert_eq!(parse_rest_seconds(Some("0 min")), 0);
        assert_eq!(parse_rest_seconds(Some("10 min")), 600);
    }

    #[test]
    fn test_fallback() {
        assert_eq!(parse_rest_seconds(None), DEFAULT_REST_SECS);
        assert_eq!(parse_rest_seconds(Some("")), DEFAULT_REST_SECS);
        assert_eq!(parse_rest_seconds(Some("as needed")), DEFAULT_REST_SECS);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(90), "1:30");
        assert_eq!(format_clock(605), "10:05");
    }
}
