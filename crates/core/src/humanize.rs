//! Compact renderings of counts, durations, percentages and ages.

use chrono::{DateTime, Utc};

/// `999`, `1.2K`, `3.4M`, `1.1B`.
pub fn format_count(n: u64) -> String {
    const UNITS: &[(u64, &str)] = &[(1_000, "K"), (1_000_000, "M"), (1_000_000_000, "B")];

    let Some(start) = UNITS.iter().rposition(|(scale, _)| n >= *scale) else {
        return n.to_string();
    };

    for (index, (scale, suffix)) in UNITS.iter().enumerate().skip(start) {
        let value = n as f64 / *scale as f64;
        // 999.6K reads as 1M, not 1000K.
        if value.round() >= 1000.0 && index + 1 < UNITS.len() {
            continue;
        }
        let rendered = if value >= 100.0 { format!("{:.0}", value) } else { format!("{:.1}", value) };
        return format!("{}{}", rendered.trim_end_matches(".0"), suffix);
    }

    n.to_string()
}

/// `0:42`, `12:34`, `1:02:03`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 { format!("{}:{:02}:{:02}", hours, minutes, secs) } else { format!("{}:{:02}", minutes, secs) }
}

/// A probability in `[0, 1]` as a whole percentage, e.g. `63%`.
pub fn format_percent(probability: f64) -> String {
    format!("{:.0}%", (probability * 100.0).clamp(0.0, 100.0))
}

/// A dollar amount in compact form, e.g. `$1.2M`.
pub fn format_money(amount: f64) -> String {
    format!("${}", format_count(amount.max(0.0).round() as u64))
}

/// How long ago `then` was, relative to `now`.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    let (value, unit) = match seconds {
        0..60 => return "just now".to_string(),
        60..3_600 => (seconds / 60, "minute"),
        3_600..86_400 => (seconds / 3_600, "hour"),
        86_400..2_592_000 => (seconds / 86_400, "day"),
        2_592_000..31_536_000 => (seconds / 2_592_000, "month"),
        _ => (seconds / 31_536_000, "year"),
    };

    format!("{} {}{} ago", value, unit, if value == 1 { "" } else { "s" })
}
