use chrono::{SecondsFormat, Utc};

pub const FALLBACK_DESCRIPTION: &str = "Receipt OCR";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

/// Everything before the first dot of the file name; empty names fall back to
/// a generic label.
pub fn description_from_file_name(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or_default().trim();
    if stem.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        stem.to_string()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
