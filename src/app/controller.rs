use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::app::state::SessionState;
use crate::config::{ConfigRegistry, DashboardConfig};
use crate::error::{AppError, Result};
use crate::fetch::{TickerFailure, WatchlistLoad, YahooProvider};
use crate::records::SnapshotTable;
use crate::ui::{run_dashboard, run_fetch_progress, ConsolePrinter, DashboardAction, DashboardState, SnapshotView};

/// Where `show` reads its snapshots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowSource<'a> {
    Live,
    File(&'a Path),
    LatestExport,
}

/// Coordinates configuration, fetching, and the dashboard screens.
pub struct AppController {
    registry: Arc<ConfigRegistry>,
}

impl AppController {
    pub fn new(registry: Arc<ConfigRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run_dashboard(&self) -> Result<()> {
        if let Err(err) = self.registry.start_watching() {
            warn!("config hot reload disabled: {err}");
        }
        let mut updates = self.registry.subscribe();
        updates.borrow_and_update();

        let mut session = SessionState::for_yahoo(self.registry.current())?;
        let load = match self.fetch_with_progress(&session).await {
            Ok(load) => load,
            Err(AppError::Cancelled) => return Ok(()),
            Err(err) => failed_load(session.config(), &err),
        };
        let mut state = DashboardState::new(Arc::clone(session.config()), load);
        report_failures(&mut state);

        loop {
            match run_dashboard(&mut state, session.provider(), &mut updates)? {
                DashboardAction::Quit => return Ok(()),
                DashboardAction::Refresh => self.reload(&session, &mut state).await,
                DashboardAction::Export => {
                    let table = SnapshotTable::new(state.load().snapshots.clone());
                    match session.records().save_overview(&table) {
                        Ok(path) => state.set_status(format!("Exported overview to {}", path.display())),
                        Err(err) => state.set_status(format!("Export failed: {err}")),
                    }
                }
                DashboardAction::ConfigChanged => {
                    let config = updates.borrow_and_update().clone();
                    let previous = Arc::clone(session.config());
                    if let Err(err) = session.reconfigure(Arc::clone(&config)) {
                        warn!("ignoring reloaded config: {err}");
                        state.set_status(format!("Config reload failed: {err}"));
                        continue;
                    }

                    if config.watchlist != previous.watchlist || config.provider != previous.provider {
                        info!("watchlist changed, refetching");
                        self.reload(&session, &mut state).await;
                    } else {
                        state.set_config(config);
                        state.set_status("Configuration reloaded.");
                    }
                }
            }
        }
    }

    /// Print snapshots for `tickers` (the watchlist when empty).
    pub async fn show(&self, tickers: &[String], source: ShowSource<'_>) -> Result<()> {
        let session = SessionState::for_yahoo(self.registry.current())?;
        let config = session.config();
        let tickers = if tickers.is_empty() {
            config.tickers()
        } else {
            tickers.to_vec()
        };
        let printer = ConsolePrinter {
            currency_symbol: &config.currency_symbol,
        };

        let table = match source {
            ShowSource::Live => {
                for (ticker, result) in session.fetch_snapshots(&tickers).await {
                    match result {
                        Ok(snapshot) => {
                            println!("{}\n{}\n", config.display_name(&ticker), printer.render(&snapshot))
                        }
                        Err(err) => eprintln!("{ticker}: {err}\n"),
                    }
                }
                return Ok(());
            }
            ShowSource::File(path) => session.records().load_overview(path)?,
            ShowSource::LatestExport => {
                let path = session.records().latest_overview().ok_or_else(|| {
                    AppError::message(format!(
                        "No overview export found in {}",
                        session.records().export_dir().display()
                    ))
                })?;
                println!("Using {}\n", path.display());
                session.records().load_overview(path)?
            }
        };

        for ticker in &tickers {
            match table.get(ticker) {
                Some(snapshot) => {
                    println!("{}\n{}\n", config.display_name(ticker), printer.render(snapshot))
                }
                None => eprintln!("{ticker}: not present in export\n"),
            }
        }
        Ok(())
    }

    pub async fn export(&self, output: Option<&Path>) -> Result<()> {
        let session = SessionState::for_yahoo(self.registry.current())?;
        let path = session.export_overview(output).await?;
        println!("Saved: {}", path.display());
        Ok(())
    }

    async fn fetch_with_progress(&self, session: &SessionState<YahooProvider>) -> Result<WatchlistLoad> {
        let (start, end) = session.history_window();
        run_fetch_progress(session.fetcher(), &session.config().tickers(), start, end).await
    }

    async fn reload(&self, session: &SessionState<YahooProvider>, state: &mut DashboardState) {
        match self.fetch_with_progress(session).await {
            Ok(load) => {
                state.replace(Arc::clone(session.config()), load);
                report_failures(state);
            }
            Err(AppError::Cancelled) => {
                keep_previous_load(state, session.config(), "Refresh cancelled.")
            }
            Err(err) => {
                warn!("watchlist refresh failed: {err}");
                keep_previous_load(state, session.config(), format!("Refresh failed: {err}"));
            }
        }
    }
}

/// The session may already run on a reloaded config; the screen follows it even without new data.
fn keep_previous_load(
    state: &mut DashboardState,
    config: &Arc<DashboardConfig>,
    status: impl Into<String>,
) {
    state.set_config(Arc::clone(config));
    state.set_status(status);
}

/// A load where every ticker carries the error that stopped the whole fetch.
fn failed_load(config: &DashboardConfig, err: &AppError) -> WatchlistLoad {
    warn!("watchlist load failed: {err}");
    WatchlistLoad {
        failures: config
            .tickers()
            .into_iter()
            .map(|ticker| TickerFailure {
                ticker,
                error: AppError::message(err.to_string()),
            })
            .collect(),
        ..WatchlistLoad::default()
    }
}

fn report_failures(state: &mut DashboardState) {
    let failed = state.load().failures.len();
    if failed > 0 {
        state.set_status(format!(
            "{failed} of {} tickers failed to load; see the cards for details. Press r to retry.",
            state.config().watchlist.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_load_marks_every_ticker() {
        let config = DashboardConfig::builtin();
        let load = failed_load(&config, &AppError::provider("connection refused"));

        assert!(load.snapshots.is_empty());
        assert_eq!(load.failures.len(), config.watchlist.len());
        assert!(load
            .failure("PETR4.SA")
            .is_some_and(|err| err.to_string().contains("connection refused")));
    }

    #[test]
    fn aborted_reload_still_applies_new_config() {
        let config = Arc::new(DashboardConfig::builtin());
        let mut state = DashboardState::new(Arc::clone(&config), WatchlistLoad::default());

        let mut reloaded = (*config).clone();
        reloaded.title = "Reloaded".to_string();
        reloaded.watchlist.truncate(1);
        keep_previous_load(&mut state, &Arc::new(reloaded), "Refresh cancelled.");

        assert_eq!(state.config().title, "Reloaded");
        assert_eq!(state.config().watchlist.len(), 1);
        assert_eq!(state.status(), Some("Refresh cancelled."));
    }
}
