//! Caption timestamps.

/// Format seconds as an SRT timestamp (`00:00:00,000`). Negative input clamps to zero.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        total_ms % 1000
    )
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let t = s.trim();
    let (hms, frac) = match t.rsplit_once([',', '.']) {
        Some((a, b)) => (a, Some(b)),
        None => (t, None),
    };

    let parts: Vec<&str> = hms.split(':').collect();
    let (h, m, sec): (u64, u64, u64) = match parts.as_slice() {
        [h, m, s] => (h.parse().ok()?, m.parse().ok()?, s.parse().ok()?),
        [m, s] => (0, m.parse().ok()?, s.parse().ok()?),
        _ => return None,
    };

    let mut millis = 0u64;
    if let Some(frac) = frac {
        let mut digits: String = frac.chars().take(3).collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        while digits.len() < 3 {
            digits.push('0');
        }
        millis = digits.parse().ok()?;
    }

    Some(((h * 60 + m) * 60 + sec) as f64 + millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_srt_timestamp(3661.123), "01:01:01,123");
        assert_eq!(format_srt_timestamp(-3.0), "00:00:00,000");
    }

    #[test]
    fn test_parse_timestamp() {
        let approx = |s: &str, want: f64| (parse_timestamp(s).unwrap() - want).abs() < 1e-9;
        assert!(approx("00:01:01,500", 61.5));
        assert!(approx("01:01:01.123", 3661.123));
        assert!(approx("02:03.4", 123.4));
        assert!(approx("00:00:05", 5.0));
        assert_eq!(parse_timestamp("garbage"), None);
    }
}
