pub mod components;
pub mod console;
pub mod screens;
pub mod styles;

use crate::fetch::{PricePoint, StockSnapshot};

pub use components::{SparklinePlot, TerminalGuard, WatchlistCard};
pub use console::ConsolePrinter;
pub use screens::{run_dashboard, run_fetch_progress, DashboardAction, DashboardState};

/// Turns one snapshot into something a surface can display.
pub trait SnapshotView {
    type Output;

    fn render(&self, snapshot: &StockSnapshot) -> Self::Output;
}

/// Turns a price series into a plot.
pub trait SeriesPlot {
    type Output;

    fn plot(&self, series: &[PricePoint]) -> Self::Output;
}
