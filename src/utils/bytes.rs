//! Human-readable byte sizes
//!
//! Sizes below 1024 are shown as an exact byte count. Larger sizes use binary
//! units (KiB, MiB, ...) formatted for the active locale.

use super::number::format_number;
use humansize::{format_size, FormatSizeOptions, BINARY};

/// Format a byte count, e.g. `512 B` or `1.5 KiB`.
///
/// humansize picks the unit; the value is then rendered with the locale's separators.
pub fn human_readable_bytes(bytes: u64, locale: &str) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let formatted = format_size(bytes, FormatSizeOptions::from(BINARY).decimal_places(6));
    let Some((value, unit)) = formatted.split_once(' ') else {
        return formatted;
    };
    match value.parse::<f64>() {
        Ok(value) => format!("{} {}", format_number(value, locale), unit),
        Err(_) => formatted,
    }
}

/// Progress line shown in the upload dialog:
/// `<loaded> / <total> - <rate>/s - <percent>%`
pub fn progress_text(loaded: u64, total: u64, bytes_per_second: f64, locale: &str) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        loaded as f64 * 100.0 / total as f64
    };

    format!(
        "{} / {} - {}/s - {}%",
        human_readable_bytes(loaded, locale),
        human_readable_bytes(total, locale),
        human_readable_bytes(bytes_per_second.max(0.0) as u64, locale),
        format_number(percent, locale)
    )
}
