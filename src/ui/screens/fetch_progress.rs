use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{prelude::*, widgets::*};

use crate::error::{AppError, Result};
use crate::fetch::{MarketDataProvider, SnapshotFetcher, WatchlistLoad};
use crate::ui::{components::utils::centered_rect, TerminalGuard};

/// Load the watchlist on the runtime while showing a progress popup; Esc aborts.
pub async fn run_fetch_progress<P>(
    fetcher: &SnapshotFetcher<P>,
    tickers: &[String],
    history_start: NaiveDate,
    history_end: NaiveDate,
) -> Result<WatchlistLoad>
where
    P: MarketDataProvider + 'static,
{
    let progress = fetcher.progress_counter();
    let total = tickers.len();
    let task_fetcher = fetcher.clone();
    let task_tickers = tickers.to_vec();
    let handle = tokio::spawn(async move {
        task_fetcher
            .fetch_watchlist(&task_tickers, history_start, history_end)
            .await
    });

    let mut guard = TerminalGuard::new()?;
    let mut cancelled = false;

    loop {
        let done = progress.load(Ordering::SeqCst);
        let ratio = if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };

        guard.draw(|f| {
            let area = centered_rect(60, 20, f.size());
            f.render_widget(Clear, area);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Loading watchlist...");
            f.render_widget(block.clone(), area);
            let inner = block.inner(area);
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                ])
                .split(inner);
            f.render_widget(
                Paragraph::new("Fetching quotes and price history").alignment(Alignment::Center),
                chunks[0],
            );
            f.render_widget(
                Gauge::default()
                    .gauge_style(Style::default().fg(Color::Cyan))
                    .ratio(ratio)
                    .label(format!("{} / {}", done.min(total), total)),
                chunks[1],
            );
            f.render_widget(
                Paragraph::new("Esc to cancel")
                    .style(Style::default().fg(Color::Gray))
                    .alignment(Alignment::Center),
                chunks[2],
            );
        })?;

        if handle.is_finished() {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(k) = event::read()? {
                if matches!(k.code, KeyCode::Esc)
                    || (k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL))
                {
                    cancelled = true;
                    handle.abort();
                    break;
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    guard.restore()?;
    if cancelled {
        let _ = handle.await;
        return Err(AppError::Cancelled);
    }

    handle.await?
}
