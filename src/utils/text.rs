use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Format with a fixed number of decimals and `,` thousands separators.
pub fn format_thousands(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", decimals as usize, rounded.abs());
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + integer.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// `$ 1,234.56` style price.
pub fn format_currency(value: Decimal, symbol: &str) -> String {
    format!("{symbol} {}", format_thousands(value, 2))
}

/// `1.23 %` style percentage.
pub fn format_percentage(value: Decimal) -> String {
    format!("{} %", format_thousands(value, 2))
}

/// Two decimals with an explicit sign.
pub fn format_signed(value: Decimal) -> String {
    let text = format_thousands(value, 2);
    if text.starts_with('-') {
        text
    } else {
        format!("+{text}")
    }
}

/// Short magnitude form used for volumes and market caps (`1.52B`).
pub fn format_compact(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    let magnitude = value.abs();
    for (scale, suffix) in UNITS {
        if magnitude >= scale {
            return format!("{:.2}{suffix}", value / scale);
        }
    }
    format!("{value:.0}")
}

pub fn format_compact_decimal(value: Decimal) -> String {
    value
        .to_f64()
        .map(format_compact)
        .unwrap_or_else(|| format_thousands(value, 0))
}

/// Cut `text` so it fits in `width` terminal cells, marking the cut with `…`.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut result = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        used += ch_width;
        result.push(ch);
    }
    result.push('…');
    result
}
