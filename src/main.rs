use clap::Parser;

use stock_dashboard::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    stock_dashboard::app::run(cli).await?;
    Ok(())
}
