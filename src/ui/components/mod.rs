pub mod card;
pub mod chart;
pub mod sparkline;
pub mod table;
pub mod terminal;
pub mod utils;

pub use card::{render_card, WatchlistCard};
pub use sparkline::SparklinePlot;
pub use table::{build_table, overview_rows, OVERVIEW_HEADERS};
pub use terminal::TerminalGuard;
