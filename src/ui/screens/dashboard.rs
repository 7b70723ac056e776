use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Paragraph, Wrap},
};
use tokio::sync::watch;

use crate::config::{DashboardConfig, HistoryPeriod, WatchlistEntry};
use crate::error::Result;
use crate::fetch::{opening_prices, MarketDataProvider, WatchlistLoad};
use crate::ui::components::chart::{render_history_panel, ChartState, HistoryView};
use crate::ui::components::table::{overview_header, overview_widths};
use crate::ui::components::utils::{grid, split_vertical};
use crate::ui::components::{build_table, overview_rows, render_card, SparklinePlot, WatchlistCard};
use crate::ui::styles::{header_text, secondary_line, LOSS};
use crate::ui::{SeriesPlot, SnapshotView, TerminalGuard};
use crate::utils::{batched, today};

const CARD_HEIGHT: u16 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Watchlist,
    History,
    Overview,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Watchlist => Focus::History,
            Focus::History => Focus::Overview,
            Focus::Overview => Focus::Watchlist,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Watchlist => Focus::Overview,
            Focus::History => Focus::Watchlist,
            Focus::Overview => Focus::History,
        }
    }
}

/// What the controller should do once the dashboard hands control back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashboardAction {
    Quit,
    Refresh,
    Export,
    ConfigChanged,
}

/// Everything the dashboard shows, independent of the terminal.
pub struct DashboardState {
    config: Arc<DashboardConfig>,
    load: WatchlistLoad,
    chart: ChartState,
    focus: Focus,
    selected: usize,
    period: HistoryPeriod,
    status: Option<String>,
}

impl DashboardState {
    pub fn new(config: Arc<DashboardConfig>, load: WatchlistLoad) -> Self {
        let mut chart = ChartState::default();
        chart.seed(load.histories.clone());
        Self {
            period: config.default_period,
            config,
            load,
            chart,
            focus: Focus::Watchlist,
            selected: 0,
            status: None,
        }
    }

    /// Swap in a fresh load, keeping the selected ticker when it is still listed.
    pub fn replace(&mut self, config: Arc<DashboardConfig>, load: WatchlistLoad) {
        let previous = self.selected_entry().map(|entry| entry.ticker.clone());
        self.chart.seed(load.histories.clone());
        self.config = config;
        self.load = load;
        self.selected = previous
            .and_then(|ticker| {
                self.config
                    .watchlist
                    .iter()
                    .position(|entry| entry.ticker == ticker)
            })
            .unwrap_or(0);
    }

    /// Take a new config whose watchlist is unchanged; loaded data stays.
    pub fn set_config(&mut self, config: Arc<DashboardConfig>) {
        self.selected = self.selected.min(config.watchlist.len().saturating_sub(1));
        if config.history_start != self.config.history_start {
            self.chart.invalidate();
        }
        self.config = config;
    }

    pub fn config(&self) -> &Arc<DashboardConfig> {
        &self.config
    }

    pub fn load(&self) -> &WatchlistLoad {
        &self.load
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn period(&self) -> HistoryPeriod {
        self.period
    }

    pub fn selected_entry(&self) -> Option<&WatchlistEntry> {
        self.config.watchlist.get(self.selected)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Apply one key press; returns an action when control must go back to the controller.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<DashboardAction> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(DashboardAction::Quit),
            KeyCode::Char('r') => return Some(DashboardAction::Refresh),
            KeyCode::Char('e') => return Some(DashboardAction::Export),
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Left => match self.focus {
                Focus::History => self.period = self.period.prev(),
                Focus::Watchlist => self.move_selection(-1),
                Focus::Overview => {}
            },
            KeyCode::Right => match self.focus {
                Focus::History => self.period = self.period.next(),
                Focus::Watchlist => self.move_selection(1),
                Focus::Overview => {}
            },
            KeyCode::Up => match self.focus {
                Focus::Watchlist => self.move_selection(-(self.columns() as isize)),
                Focus::Overview => self.move_selection(-1),
                Focus::History => {}
            },
            KeyCode::Down => match self.focus {
                Focus::Watchlist => self.move_selection(self.columns() as isize),
                Focus::Overview => self.move_selection(1),
                Focus::History => {}
            },
            _ => {}
        }
        None
    }

    fn columns(&self) -> usize {
        self.config.watchlist_columns.max(1)
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.config.watchlist.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let target = self.selected as isize + delta;
        if (0..len as isize).contains(&target) {
            self.selected = target as usize;
        }
    }

    fn card_lines(&self, entry: &WatchlistEntry) -> Vec<Line<'static>> {
        if let Some(snapshot) = self.load.snapshot(&entry.ticker) {
            let card = WatchlistCard {
                name: &entry.name,
                currency_symbol: &self.config.currency_symbol,
            };
            return card.render(snapshot);
        }

        let message = self
            .load
            .failure(&entry.ticker)
            .map(|err| err.to_string())
            .unwrap_or_else(|| "No data".to_string());
        vec![
            Line::from(Span::from(entry.name.clone()).bold()),
            secondary_line(entry.ticker.clone()),
            Line::from(Span::styled(message, Style::default().fg(LOSS))),
        ]
    }

    /// Cards plot the whole fetched history; only the history panel follows the period.
    fn card_sparkline(&self, ticker: &str, width: u16) -> Option<String> {
        let history = self.chart.history_for(ticker)?;
        let plot = SparklinePlot::new(usize::from(width.saturating_sub(2)));
        Some(plot.plot(&opening_prices(history)))
    }
}

/// Drive the dashboard until the user asks for something the controller handles.
pub fn run_dashboard<P>(
    state: &mut DashboardState,
    provider: &Arc<P>,
    config_updates: &mut watch::Receiver<Arc<DashboardConfig>>,
) -> Result<DashboardAction>
where
    P: MarketDataProvider + 'static,
{
    let mut guard = TerminalGuard::new()?;

    loop {
        if matches!(config_updates.has_changed(), Ok(true)) {
            debug!("configuration changed, leaving dashboard for reload");
            guard.restore()?;
            return Ok(DashboardAction::ConfigChanged);
        }

        let today = today();
        let config = Arc::clone(&state.config);
        if let Some(entry) = state.selected_entry().cloned() {
            state
                .chart
                .prepare_history(provider, &entry.ticker, config.history_start, today);
        }
        state.chart.poll_pending();

        let card_rows = batched(&config.watchlist, config.watchlist_columns)?;

        guard.draw(|f| draw(f, state, &card_rows, today))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let action = if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
                    Some(DashboardAction::Quit)
                } else {
                    state.handle_key(k.code)
                };
                if let Some(action) = action {
                    guard.restore()?;
                    return Ok(action);
                }
            }
        }
    }
}

fn draw(f: &mut Frame<'_>, state: &DashboardState, card_rows: &[&[WatchlistEntry]], today: NaiveDate) {
    let area = f.size();
    let grid_height = (card_rows.len() as u16 * CARD_HEIGHT).min(area.height / 3);
    let table_height = (state.load.snapshots.len() as u16 + 3).min(area.height / 4);
    let segments = split_vertical(
        area,
        &[
            Constraint::Length(1),
            Constraint::Length(grid_height),
            Constraint::Min(10),
            Constraint::Length(table_height),
            Constraint::Length(1),
        ],
    );

    f.render_widget(
        Paragraph::new(header_text(format!(
            "{} • {}",
            state.config.title,
            today.format("%Y-%m-%d")
        ))),
        segments[0],
    );

    let columns = state.columns();
    let cells = grid(segments[1], card_rows.len(), columns);
    for (row_idx, entries) in card_rows.iter().enumerate() {
        for (col_idx, entry) in entries.iter().enumerate() {
            let Some(cell) = cells.get(row_idx).and_then(|row| row.get(col_idx)) else {
                continue;
            };
            let index = row_idx * columns + col_idx;
            let selected = index == state.selected && state.focus == Focus::Watchlist;
            render_card(
                f,
                *cell,
                state.card_lines(entry),
                state.card_sparkline(&entry.ticker, cell.width),
                selected,
            );
        }
    }

    if let Some(entry) = state.selected_entry() {
        let view = HistoryView {
            ticker: &entry.ticker,
            name: &entry.name,
            period: state.period,
            today,
            snapshot: state.load.snapshot(&entry.ticker),
            focused: state.focus == Focus::History,
        };
        render_history_panel(f, segments[2], &state.chart, &view);
    }

    let selected_row = state.selected_entry().and_then(|entry| {
        state
            .load
            .snapshots
            .iter()
            .position(|snapshot| snapshot.ticker() == entry.ticker)
    });
    let rows = overview_rows(&state.load.snapshots, &state.load.histories, today, selected_row);
    let table = build_table(
        rows,
        overview_header(),
        overview_widths(),
        format!("Overview ({} tickers)", state.load.snapshots.len()),
        state.focus == Focus::Overview,
    );
    f.render_widget(table, segments[3]);

    let footer = match state.status() {
        Some(status) => Line::from(status.to_string()),
        None => secondary_line(
            "Tab focus • ←/→/↑/↓ select ticker or period • r refetch • e export • q quit",
        ),
    };
    f.render_widget(Paragraph::new(footer).wrap(Wrap { trim: true }), segments[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::history::candle_on;
    use crate::fetch::normalize;
    use crate::fetch::snapshots::tests::aapl_quote;
    use std::collections::HashMap;

    fn state_with(tickers: &[&str], columns: usize) -> DashboardState {
        let mut config = DashboardConfig::builtin();
        config.watchlist = tickers
            .iter()
            .map(|ticker| WatchlistEntry::new(*ticker, *ticker))
            .collect();
        config.watchlist_columns = columns;
        DashboardState::new(Arc::new(config), WatchlistLoad::default())
    }

    #[test]
    fn control_keys_map_to_actions() {
        let mut state = state_with(&["AAA"], 4);
        assert_eq!(state.handle_key(KeyCode::Char('q')), Some(DashboardAction::Quit));
        assert_eq!(state.handle_key(KeyCode::Esc), Some(DashboardAction::Quit));
        assert_eq!(state.handle_key(KeyCode::Char('r')), Some(DashboardAction::Refresh));
        assert_eq!(state.handle_key(KeyCode::Char('e')), Some(DashboardAction::Export));
        assert_eq!(state.handle_key(KeyCode::Char('x')), None);
    }

    #[test]
    fn tab_cycles_focus() {
        let mut state = state_with(&["AAA"], 4);
        assert_eq!(state.focus(), Focus::Watchlist);
        state.handle_key(KeyCode::Tab);
        assert_eq!(state.focus(), Focus::History);
        state.handle_key(KeyCode::Tab);
        assert_eq!(state.focus(), Focus::Overview);
        state.handle_key(KeyCode::BackTab);
        assert_eq!(state.focus(), Focus::History);
    }

    #[test]
    fn arrows_move_through_grid_and_stay_in_bounds() {
        let mut state = state_with(&["A", "B", "C", "D", "E"], 2);
        state.handle_key(KeyCode::Left);
        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("A"));
        state.handle_key(KeyCode::Right);
        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("B"));
        state.handle_key(KeyCode::Down);
        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("D"));
        state.handle_key(KeyCode::Down);
        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("D"));
        state.handle_key(KeyCode::Up);
        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("B"));
    }

    #[test]
    fn arrows_cycle_period_when_history_focused() {
        let mut state = state_with(&["AAA"], 4);
        let initial = state.period();
        state.handle_key(KeyCode::Tab);
        state.handle_key(KeyCode::Right);
        assert_eq!(state.period(), initial.next());
        state.handle_key(KeyCode::Left);
        assert_eq!(state.period(), initial);
    }

    #[test]
    fn card_sparkline_ignores_selected_period() {
        let mut state = state_with(&["AAA"], 4);
        let today = crate::utils::today();
        let candles: Vec<_> = (0..400)
            .rev()
            .map(|days| {
                let date = today - chrono::Duration::days(days);
                candle_on(date, 100.0 + (days % 17) as f64, 100.0, 1.0)
            })
            .collect();
        state.chart.seed(HashMap::from([("AAA".to_string(), candles)]));

        let before = state.card_sparkline("AAA", 24).unwrap();
        state.handle_key(KeyCode::Tab);
        state.handle_key(KeyCode::Left);
        assert_ne!(state.period(), state.config().default_period);
        assert_eq!(state.card_sparkline("AAA", 24).unwrap(), before);
    }

    #[test]
    fn set_config_keeps_loaded_data() {
        let mut state = state_with(&["AAA"], 4);
        state.load.snapshots.push(normalize(aapl_quote()).unwrap());

        let mut config = (**state.config()).clone();
        config.currency_symbol = "R$".to_string();
        state.set_config(Arc::new(config));

        assert_eq!(state.config().currency_symbol, "R$");
        assert_eq!(state.load().snapshots.len(), 1);
    }

    #[test]
    fn replace_keeps_selected_ticker() {
        let mut state = state_with(&["A", "B", "C"], 3);
        state.handle_key(KeyCode::Right);
        state.handle_key(KeyCode::Right);

        let mut config = (**state.config()).clone();
        config.watchlist.reverse();
        let load = WatchlistLoad {
            snapshots: vec![normalize(aapl_quote()).unwrap()],
            ..WatchlistLoad::default()
        };
        state.replace(Arc::new(config), load);

        assert_eq!(state.selected_entry().map(|e| e.ticker.as_str()), Some("C"));
        assert_eq!(state.load().snapshots.len(), 1);
    }

    #[test]
    fn failed_ticker_card_shows_the_error() {
        let mut state = state_with(&["BAD"], 4);
        state.load.failures.push(crate::fetch::TickerFailure {
            ticker: "BAD".to_string(),
            error: crate::error::AppError::unavailable("BAD", "symbol not found"),
        });
        let entry = WatchlistEntry::new("BAD", "BAD");
        let lines = state.card_lines(&entry);
        let message: String = lines[2].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(message.contains("symbol not found"), "{message}");
    }
}
