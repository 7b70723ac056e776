use std::collections::HashMap;

use chrono::NaiveDate;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::config::HistoryPeriod;
use crate::fetch::{filter_history, opening_prices, Candle, StockSnapshot};
use crate::ui::components::SparklinePlot;
use crate::ui::styles::{border_style, row_style, trend_color, ACCENT};
use crate::ui::SeriesPlot;
use crate::utils::{format_compact_decimal, format_currency, format_percentage, format_signed, format_trade_time};

pub const OVERVIEW_HEADERS: [&str; 8] = [
    "Ticker",
    "Last trade",
    "Last price",
    "Prev close",
    "Change",
    "Change %",
    "Market cap",
    "12-month trend",
];

const TREND_WIDTH: usize = 24;
const OVERVIEW_CURRENCY: &str = "$";

pub fn build_table<'a>(
    rows: Vec<Row<'a>>,
    header: Row<'a>,
    widths: Vec<Constraint>,
    title: impl Into<String>,
    focused: bool,
) -> Table<'a> {
    Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(focused))
                .title(title.into()),
        )
        .column_spacing(2)
}

pub fn overview_widths() -> Vec<Constraint> {
    vec![
        Constraint::Length(11),
        Constraint::Length(17),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(9),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Min(TREND_WIDTH as u16),
    ]
}

pub fn overview_header() -> Row<'static> {
    Row::new(
        OVERVIEW_HEADERS
            .iter()
            .map(|label| Cell::from(*label).style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
    )
}

/// One row per snapshot; odd rows shaded, change columns colored by direction.
pub fn overview_rows(
    snapshots: &[StockSnapshot],
    histories: &HashMap<String, Vec<Candle>>,
    today: NaiveDate,
    selected: Option<usize>,
) -> Vec<Row<'static>> {
    let plot = SparklinePlot::new(TREND_WIDTH);
    snapshots
        .iter()
        .enumerate()
        .map(|(idx, snapshot)| {
            let direction = Style::default().fg(trend_color(snapshot.is_down()));
            let trend = histories
                .get(snapshot.ticker())
                .map(|candles| {
                    let window = filter_history(candles, HistoryPeriod::Yearly, today);
                    plot.plot(&opening_prices(&window))
                })
                .unwrap_or_default();

            let mut row = Row::new(vec![
                Cell::from(snapshot.ticker().to_string()),
                Cell::from(format_trade_time(snapshot.last_trade_time())),
                Cell::from(format_currency(snapshot.last_price(), OVERVIEW_CURRENCY)),
                Cell::from(format_currency(snapshot.previous_day_price(), OVERVIEW_CURRENCY)),
                Cell::from(format_signed(snapshot.change())).style(direction),
                Cell::from(format_percentage(snapshot.change_pct())).style(direction),
                Cell::from(
                    snapshot
                        .marketcap()
                        .map(format_compact_decimal)
                        .unwrap_or_else(|| "n/a".to_string()),
                ),
                Cell::from(trend).style(Style::default().fg(Color::Cyan)),
            ])
            .style(row_style(idx));
            if selected == Some(idx) {
                row = row.add_modifier(Modifier::REVERSED);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::normalize;
    use crate::fetch::snapshots::tests::aapl_quote;
    use crate::ui::styles::SHADED_ROW;

    #[test]
    fn shades_odd_rows_only() {
        let snapshot = normalize(aapl_quote()).unwrap();
        let snapshots = vec![snapshot.clone(), snapshot.clone(), snapshot];
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = overview_rows(&snapshots, &HashMap::new(), today, None);

        assert_eq!(rows.len(), 3);
        assert_eq!(row_style(0).bg, None);
        assert_eq!(row_style(1).bg, Some(SHADED_ROW));
        assert_eq!(row_style(2).bg, None);
        assert_eq!(OVERVIEW_HEADERS.len(), overview_widths().len());
    }
}
