use std::borrow::Cow;

use ratatui::prelude::Stylize;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

/// Accent color used for prompts, highlights, and status badges.
pub const ACCENT: Color = Color::Indexed(208);
pub const GAIN: Color = Color::Green;
pub const LOSS: Color = Color::Red;
/// Background of odd overview rows.
pub const SHADED_ROW: Color = Color::Indexed(236);

/// Build a styled text block for headers.
pub fn header_text<'a>(text: impl Into<Cow<'a, str>>) -> Text<'a> {
    let owned = text.into().into_owned();
    Text::from(owned.bold().fg(ACCENT))
}

/// Produce a dimmed line for secondary descriptions and hints.
pub fn secondary_line<'a>(text: impl Into<Cow<'a, str>>) -> Line<'a> {
    let owned = text.into().into_owned();
    Line::from(owned.dim())
}

/// Dimmed text chunk for inline usage.
pub fn secondary_span<'a>(text: impl Into<Cow<'a, str>>) -> Span<'a> {
    let owned = text.into().into_owned();
    Span::from(owned).dim()
}

pub fn trend_color(is_down: bool) -> Color {
    if is_down {
        LOSS
    } else {
        GAIN
    }
}

pub fn trend_arrow(is_down: bool) -> &'static str {
    if is_down {
        "▼"
    } else {
        "▲"
    }
}

pub fn row_style(index: usize) -> Style {
    if index % 2 == 1 {
        Style::default().bg(SHADED_ROW)
    } else {
        Style::default()
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
