use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::fetch::StockSnapshot;
use crate::ui::styles::{border_style, secondary_span, trend_arrow, trend_color};
use crate::ui::SnapshotView;
use crate::utils::{format_currency, format_percentage, truncate_to_width};

/// Watchlist tile: name, ticker, colored change and last price.
pub struct WatchlistCard<'a> {
    pub name: &'a str,
    pub currency_symbol: &'a str,
}

impl SnapshotView for WatchlistCard<'_> {
    type Output = Vec<Line<'static>>;

    fn render(&self, snapshot: &StockSnapshot) -> Self::Output {
        let color = trend_color(snapshot.is_down());
        vec![
            Line::from(Span::from(self.name.to_string()).bold()),
            Line::from(secondary_span(snapshot.ticker().to_string())),
            Line::from(Span::styled(
                format!(
                    "{} {}",
                    trend_arrow(snapshot.is_down()),
                    format_percentage(snapshot.change_pct())
                ),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(format_currency(snapshot.last_price(), self.currency_symbol)),
        ]
    }
}

/// Draw a card body with an optional sparkline row; `body` comes from [`WatchlistCard`] or an error message.
pub fn render_card(
    f: &mut Frame<'_>,
    area: Rect,
    mut body: Vec<Line<'static>>,
    sparkline: Option<String>,
    selected: bool,
) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    if let Some(spark) = sparkline {
        body.push(Line::from(Span::styled(
            truncate_to_width(&spark, inner_width),
            Style::default().fg(Color::Cyan),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(selected));
    f.render_widget(Paragraph::new(body).block(block), area);
}
