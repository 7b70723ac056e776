use std::sync::Arc;

use crate::app::controller::{AppController, ShowSource};
use crate::cli::{Cli, Commands};
use crate::config::ConfigRegistry;
use crate::error::Result;

/// Entry point used by `main` to bootstrap the controller stack.
pub async fn run(cli: Cli) -> Result<()> {
    let registry = Arc::new(ConfigRegistry::new(cli.config.as_deref())?);
    let controller = AppController::new(registry);

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => controller.run_dashboard().await,
        Commands::Show {
            tickers,
            from_file,
            latest,
        } => {
            let source = match (&from_file, latest) {
                (Some(path), _) => ShowSource::File(path),
                (None, true) => ShowSource::LatestExport,
                (None, false) => ShowSource::Live,
            };
            controller.show(&tickers, source).await
        }
        Commands::Export { output } => controller.export(output.as_deref()).await,
    }
}
