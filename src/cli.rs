use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stock-dashboard")]
#[command(about = "Terminal dashboard for a watchlist of stock tickers")]
#[command(version)]
pub struct Cli {
    /// Dashboard config file (defaults to assets/configs/dashboard.json when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard (default)
    Dashboard,

    /// Print snapshots for the given tickers, or the whole watchlist
    Show {
        /// Ticker symbols (e.g. PETR4.SA AAPL)
        tickers: Vec<String>,

        /// Read snapshots from an overview export instead of fetching
        #[arg(short, long, conflicts_with = "latest")]
        from_file: Option<PathBuf>,

        /// Read snapshots from the most recent overview export
        #[arg(short, long)]
        latest: bool,
    },

    /// Fetch the watchlist and write the overview CSV
    Export {
        /// Directory for the CSV (defaults to the configured export dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
