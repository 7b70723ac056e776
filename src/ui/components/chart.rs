use std::collections::HashMap;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;

use chrono::NaiveDate;
use ratatui::{
    prelude::*,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Block, Borders, Paragraph, Wrap,
    },
};

use crate::config::HistoryPeriod;
use crate::fetch::{filter_history, spawn_history_fetch, Candle, HistoryReceiver, MarketDataProvider, StockSnapshot};
use crate::records::HistoryIndicators;
use crate::ui::components::utils::split_vertical;
use crate::ui::styles::{border_style, GAIN, LOSS};
use crate::utils::{format_compact, format_compact_decimal};

const BODY_EPSILON: f64 = 1e-4;
const DATE_LABEL_FMT: &str = "%Y-%m-%d";
const DATE_LABEL_FMT_SHORT: &str = "%m-%d";
const DATE_LABEL_FMT_MEDIUM: &str = "%Y-%m";
const LEFT_MARGIN: f64 = 7.0;
const RIGHT_MARGIN: f64 = 1.0;

/// Caches per-ticker candles and tracks background history fetches.
#[derive(Default)]
pub struct ChartState {
    history_cache: HashMap<String, Vec<Candle>>,
    pending_fetches: HashMap<String, HistoryReceiver>,
    errors: HashMap<String, String>,
}

impl ChartState {
    /// Replace the cache with histories loaded alongside the watchlist.
    pub fn seed(&mut self, histories: HashMap<String, Vec<Candle>>) {
        self.history_cache = histories;
        self.pending_fetches.clear();
        self.errors.clear();
    }

    /// Start a background fetch for `ticker` unless it is cached, in flight, or already failed.
    pub fn prepare_history<P>(
        &mut self,
        provider: &Arc<P>,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) where
        P: MarketDataProvider + 'static,
    {
        self.poll_pending();

        if self.history_cache.contains_key(ticker)
            || self.pending_fetches.contains_key(ticker)
            || self.errors.contains_key(ticker)
        {
            return;
        }

        let rx = spawn_history_fetch(Arc::clone(provider), ticker, start, end);
        self.pending_fetches.insert(ticker.to_string(), rx);
    }

    /// Move finished fetches into the cache (or the error map).
    pub fn poll_pending(&mut self) {
        let mut finished = Vec::new();
        for (ticker, rx) in &self.pending_fetches {
            match rx.try_recv() {
                Ok(outcome) => finished.push((ticker.clone(), Some(outcome))),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => finished.push((ticker.clone(), None)),
            }
        }

        for (ticker, outcome) in finished {
            self.pending_fetches.remove(&ticker);
            match outcome {
                Some(Ok(history)) => {
                    self.history_cache.insert(ticker, history);
                }
                Some(Err(err)) => {
                    self.errors.insert(ticker, err.to_string());
                }
                None => {
                    self.errors.insert(
                        ticker,
                        "History fetch task ended unexpectedly".to_string(),
                    );
                }
            }
        }
    }

    pub fn history_for(&self, ticker: &str) -> Option<&[Candle]> {
        self.history_cache.get(ticker).map(Vec::as_slice)
    }

    pub fn last_error(&self, ticker: &str) -> Option<&str> {
        self.errors.get(ticker).map(String::as_str)
    }

    pub fn is_loading(&self, ticker: &str) -> bool {
        self.pending_fetches.contains_key(ticker)
    }

    /// Forget cached histories and failures so the next selection refetches.
    pub fn invalidate(&mut self) {
        self.history_cache.clear();
        self.pending_fetches.clear();
        self.errors.clear();
    }
}

/// What the history panel is asked to show.
pub struct HistoryView<'a> {
    pub ticker: &'a str,
    pub name: &'a str,
    pub period: HistoryPeriod,
    pub today: NaiveDate,
    pub snapshot: Option<&'a StockSnapshot>,
    pub focused: bool,
}

pub fn render_history_panel(f: &mut Frame<'_>, area: Rect, chart: &ChartState, view: &HistoryView<'_>) {
    let segments = split_vertical(
        area,
        &[
            Constraint::Percentage(62),
            Constraint::Min(4),
            Constraint::Length(2),
        ],
    );
    let (candle_area, volume_area, footer_area) = (segments[0], segments[1], segments[2]);

    let legend = HistoryPeriod::ALL
        .iter()
        .map(|period| {
            if *period == view.period {
                format!("[{}]", period.label())
            } else {
                period.label().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    let title = format!("{} ({}) | {}", view.name, view.ticker, legend);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(view.focused))
        .title(title);

    let Some(history) = chart.history_for(view.ticker) else {
        let message = match chart.last_error(view.ticker) {
            Some(err) => err.to_string(),
            None if chart.is_loading(view.ticker) => "Loading historical prices…".to_string(),
            None => "No history requested yet.".to_string(),
        };
        f.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    };

    let filtered = filter_history(history, view.period, view.today);
    if filtered.is_empty() {
        f.render_widget(
            Paragraph::new(format!("No sessions in the {} window.", view.period.label()))
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    let draw_series = compress_to_width(&filtered, candle_area.width);
    f.render_widget(candlestick_canvas(&draw_series, candle_area, block), candle_area);
    f.render_widget(volume_canvas(&draw_series, volume_area, view.focused), volume_area);

    let footer = indicator_line(&filtered, view.snapshot);
    f.render_widget(
        Paragraph::new(footer)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true }),
        footer_area,
    );
}

fn indicator_line(window: &[Candle], snapshot: Option<&StockSnapshot>) -> String {
    let marketcap = snapshot
        .and_then(StockSnapshot::marketcap)
        .map(format_compact_decimal)
        .unwrap_or_else(|| "n/a".to_string());

    match HistoryIndicators::from_candles(window) {
        Some(ind) => format!(
            "Volume min {} • max {} • mean {} | Close min {:.2} • max {:.2} | Market cap {}",
            format_compact(ind.min_volume),
            format_compact(ind.max_volume),
            format_compact(ind.mean_volume),
            ind.min_close,
            ind.max_close,
            marketcap
        ),
        None => format!("Market cap {marketcap}"),
    }
}

struct XAxis {
    origin: f64,
    end: f64,
    scale: f64,
    half_body: f64,
    half_wick: f64,
}

fn x_axis(series_len: usize, width: u16) -> XAxis {
    let width_px = width.max(1) as f64;
    let available_width = (width_px - LEFT_MARGIN - RIGHT_MARGIN).max(1.0);
    let scale = if series_len > 1 {
        available_width / (series_len.saturating_sub(1) as f64)
    } else {
        0.0
    };
    let base_width = if series_len > 1 { scale } else { available_width };
    let half_body = (base_width * 0.35).clamp(0.03, 0.3);
    XAxis {
        origin: LEFT_MARGIN,
        end: LEFT_MARGIN + available_width,
        scale,
        half_body,
        half_wick: half_body.min(0.2).max(0.03),
    }
}

fn candle_color(candle: &Candle) -> Color {
    if candle.close >= candle.open {
        GAIN
    } else {
        LOSS
    }
}

fn candlestick_canvas<'a>(candles: &[Candle], area: Rect, block: Block<'a>) -> Canvas<'a, impl Fn(&mut ratatui::widgets::canvas::Context<'_>) + 'a> {
    let axis = x_axis(candles.len(), area.width);
    let height_px = area.height.max(1) as f64;

    let (y_min, y_max) = candles.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), candle| (lo.min(candle.low), hi.max(candle.high)),
    );

    let top_margin = 1.0;
    let axis_y = 1.0;
    let available_height = (height_px - axis_y - top_margin).max(1.0);
    let price_range = (y_max - y_min).max(0.01);
    let price_scale = available_height / price_range;
    let axis_y_top = axis_y + available_height;

    let price_label_x = axis.origin - 0.2 - 5.0 - 1.2;
    let price_ticks = compute_price_ticks(y_min, y_min + price_range, 6)
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(Vec::new(), |mut acc: Vec<(f64, String)>, value| {
            if !acc.iter().any(|(existing, _)| (existing - value).abs() < 1e-6) {
                acc.push((value, format!("{:.2}", (value * 100.0).round() / 100.0)));
            }
            acc
        });
    let date_ticks = compute_date_ticks(candles, 6)
        .into_iter()
        .map(|(idx, label)| (axis.origin + idx as f64 * axis.scale, label))
        .collect::<Vec<_>>();

    let candles = candles.to_vec();
    Canvas::default()
        .block(block)
        .marker(Marker::HalfBlock)
        .x_bounds([0.0, area.width.max(1) as f64])
        .y_bounds([-1.0, height_px])
        .paint(move |ctx| {
            let axis_color = Color::DarkGray;
            for (idx, candle) in candles.iter().enumerate() {
                let x = axis.origin + (idx as f64) * axis.scale;
                let low = axis_y + (candle.low - y_min) * price_scale;
                let high = axis_y + (candle.high - y_min) * price_scale;
                let open = axis_y + (candle.open - y_min) * price_scale;
                let close = axis_y + (candle.close - y_min) * price_scale;
                let color = candle_color(candle);

                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: low,
                    x2: x,
                    y2: high,
                    color,
                });

                let body_top = open.max(close);
                let body_bottom = open.min(close);
                if (body_top - body_bottom).abs() < BODY_EPSILON {
                    ctx.draw(&CanvasLine {
                        x1: x - axis.half_wick,
                        y1: body_top,
                        x2: x + axis.half_wick,
                        y2: body_top,
                        color,
                    });
                } else {
                    ctx.draw(&Rectangle {
                        x: x - axis.half_body,
                        y: body_bottom,
                        width: axis.half_body * 2.0,
                        height: body_top - body_bottom,
                        color,
                    });
                }
            }

            ctx.layer();
            ctx.draw(&CanvasLine {
                x1: axis.origin,
                y1: axis_y,
                x2: axis.end,
                y2: axis_y,
                color: axis_color,
            });
            ctx.draw(&CanvasLine {
                x1: axis.origin,
                y1: axis_y,
                x2: axis.origin,
                y2: axis_y_top,
                color: axis_color,
            });

            for (value, label) in &price_ticks {
                let coord = axis_y + (value - y_min) * price_scale;
                if coord < axis_y - 0.001 || coord > axis_y_top + 0.001 {
                    continue;
                }
                ctx.print(price_label_x, coord, label.clone());
            }

            for (x_pos, label) in &date_ticks {
                ctx.print(*x_pos, -1.0, label.clone());
            }
        })
}

fn volume_canvas<'a>(candles: &[Candle], area: Rect, focused: bool) -> Canvas<'a, impl Fn(&mut ratatui::widgets::canvas::Context<'_>) + 'a> {
    let axis = x_axis(candles.len(), area.width);
    let height_px = area.height.max(1) as f64;
    let max_volume = candles
        .iter()
        .map(|candle| candle.volume)
        .fold(0.0, f64::max)
        .max(1.0);
    let volume_scale = (height_px - 1.0).max(1.0) / max_volume;
    let label = format_compact(max_volume);

    let bars = candles
        .iter()
        .map(|candle| (candle.volume, candle_color(candle)))
        .collect::<Vec<_>>();
    Canvas::default()
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_style(border_style(focused))
                .title("Volume"),
        )
        .marker(Marker::HalfBlock)
        .x_bounds([0.0, area.width.max(1) as f64])
        .y_bounds([0.0, height_px])
        .paint(move |ctx| {
            for (idx, (volume, color)) in bars.iter().enumerate() {
                let x = axis.origin + (idx as f64) * axis.scale;
                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: 0.0,
                    x2: x,
                    y2: volume * volume_scale,
                    color: *color,
                });
            }
            ctx.print(0.0, height_px - 1.0, label.clone());
        })
}

/// Merge neighbouring candles so at most two candles share a terminal column.
pub fn compress_to_width(candles: &[Candle], width: u16) -> Vec<Candle> {
    let max_points = usize::from(width.max(1)) * 2;
    if candles.len() <= max_points {
        return candles.to_vec();
    }

    let stride = candles.len().div_ceil(max_points);
    candles
        .chunks(stride)
        .filter_map(|chunk| {
            let (first, last) = (chunk.first()?, chunk.last()?);
            Some(Candle {
                timestamp: last.timestamp,
                open: first.open,
                close: last.close,
                high: chunk.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
                low: chunk.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
                volume: chunk.iter().map(|c| c.volume).sum(),
            })
        })
        .take(max_points)
        .collect()
}

fn compute_price_ticks(min: f64, max: f64, desired: usize) -> Vec<f64> {
    let desired = desired.max(2);
    if !min.is_finite() || !max.is_finite() {
        return vec![0.0, 1.0];
    }

    let mut effective_min = min;
    let mut effective_max = max.max(effective_min + f64::EPSILON);

    if (effective_max - effective_min).abs() < 1e-6 {
        let span = if effective_min.abs() < 1.0 {
            1.0
        } else {
            effective_min.abs() * 0.05
        };
        effective_min -= span / 2.0;
        effective_max += span / 2.0;
    }

    let step = (effective_max - effective_min) / (desired as f64 - 1.0);
    (0..desired)
        .map(|i| effective_min + step * i as f64)
        .collect()
}

fn compute_date_ticks(candles: &[Candle], desired: usize) -> Vec<(usize, String)> {
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return Vec::new();
    };

    let last_index = candles.len() - 1;
    if last_index == 0 {
        return vec![(0, first.local_date().format(DATE_LABEL_FMT).to_string())];
    }

    let desired = desired.max(2).min(candles.len());
    let step = (last_index as f64) / (desired.saturating_sub(1) as f64);
    let mut indices: Vec<usize> = (0..desired)
        .map(|i| ((i as f64 * step).round() as usize).min(last_index))
        .collect();
    indices.push(0);
    indices.push(last_index);
    indices.sort_unstable();
    indices.dedup();

    let total_days = (last.local_date() - first.local_date()).num_days().abs();
    let mid_format = if total_days > 365 {
        DATE_LABEL_FMT_MEDIUM
    } else {
        DATE_LABEL_FMT_SHORT
    };

    indices
        .into_iter()
        .map(|idx| {
            let date = candles[idx].local_date();
            let label = if idx == 0 || idx == last_index {
                date.format(DATE_LABEL_FMT).to_string()
            } else {
                date.format(mid_format).to_string()
            };
            (idx, label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::history::candle_on;
    use crate::fetch::snapshots::tests::StaticProvider;
    use chrono::Duration;

    fn series(days: i64) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..days)
            .map(|offset| candle_on(start + Duration::days(offset), 10.0 + offset as f64, 10.5 + offset as f64, 100.0))
            .collect()
    }

    #[test]
    fn compresses_wide_series() {
        let candles = series(100);
        let compressed = compress_to_width(&candles, 10);
        assert_eq!(compressed.len(), 20);
        assert_eq!(compressed[0].open, candles[0].open);
        assert_eq!(compressed[0].close, candles[4].close);
        assert_eq!(compressed[0].volume, 500.0);

        assert_eq!(compress_to_width(&candles[..5], 10).len(), 5);
    }

    #[test]
    fn price_ticks_widen_flat_ranges() {
        let ticks = compute_price_ticks(50.0, 50.0, 5);
        assert_eq!(ticks.len(), 5);
        assert!(ticks[0] < 50.0 && ticks[4] > 50.0);
    }

    #[test]
    fn date_ticks_label_both_ends() {
        let candles = series(30);
        let ticks = compute_date_ticks(&candles, 4);
        assert_eq!(ticks.first().map(|(idx, _)| *idx), Some(0));
        assert_eq!(ticks.last().map(|(idx, _)| *idx), Some(29));
        assert_eq!(ticks[0].1, "2024-01-01");
        assert!(compute_date_ticks(&[], 4).is_empty());
    }

    #[tokio::test]
    async fn history_fetch_lands_in_cache() {
        let mut provider = StaticProvider::default();
        provider.candles.insert("AAA".to_string(), series(3));
        let provider = Arc::new(provider);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let mut state = ChartState::default();
        state.prepare_history(&provider, "AAA", day, day);
        state.prepare_history(&provider, "MISSING", day, day);
        assert!(state.is_loading("AAA"));

        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            state.poll_pending();
            if !state.is_loading("AAA") && !state.is_loading("MISSING") {
                break;
            }
        }

        assert_eq!(state.history_for("AAA").map(<[Candle]>::len), Some(3));
        assert!(state.last_error("MISSING").is_some());

        state.invalidate();
        assert!(state.history_for("AAA").is_none());
        assert!(state.last_error("MISSING").is_none());
    }
}
