//! Locale-aware number formatting
//!
//! Numbers are shown with at most two fractional digits, trailing zeros
//! dropped, using the decimal and grouping separators of the active locale.

/// Separators used by a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal: char,
    pub group: char,
}

const COMMA_DECIMAL_DOT_GROUP: NumberFormat = NumberFormat { decimal: ',', group: '.' };
const COMMA_DECIMAL_SPACE_GROUP: NumberFormat = NumberFormat { decimal: ',', group: '\u{a0}' };
const DOT_DECIMAL_COMMA_GROUP: NumberFormat = NumberFormat { decimal: '.', group: ',' };

/// Resolve the separators for a BCP 47 locale tag such as `es`, `fr-FR` or `de-CH`
pub fn number_format(locale: &str) -> NumberFormat {
    let tag = locale.trim().to_ascii_lowercase().replace('_', "-");
    let mut parts = tag.split('-');
    let language = parts.next().unwrap_or_default();
    let region = parts.next().unwrap_or_default();

    match (language, region) {
        ("de" | "it", "ch") | ("fr", "ch") => NumberFormat { decimal: '.', group: '\u{2019}' },
        ("fr", _) => NumberFormat { decimal: ',', group: '\u{202f}' },
        ("de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" | "el" | "ca" | "gl" | "eu" | "ro" | "hr" | "sl", _) => {
            COMMA_DECIMAL_DOT_GROUP
        }
        ("ru" | "pl" | "cs" | "sk" | "sv" | "fi" | "nb" | "no" | "uk" | "hu" | "bg" | "lt" | "lv" | "et", _) => {
            COMMA_DECIMAL_SPACE_GROUP
        }
        _ => DOT_DECIMAL_COMMA_GROUP,
    }
}

/// Format `value` with up to two fractional digits for `locale`
pub fn format_number(value: f64, locale: &str) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let format = number_format(locale);
    let hundredths = (value.abs() * 100.0).round() as u128;
    let integer = hundredths / 100;
    let fraction = hundredths % 100;

    let mut out = String::new();
    if value < 0.0 && hundredths > 0 {
        out.push('-');
    }
    out.push_str(&group_digits(integer, format.group));

    if fraction > 0 {
        out.push(format.decimal);
        if fraction % 10 == 0 {
            out.push_str(&(fraction / 10).to_string());
        } else {
            out.push_str(&format!("{:02}", fraction));
        }
    }

    out
}

fn group_digits(integer: u128, separator: char) -> String {
    let digits = integer.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }

    grouped
}
