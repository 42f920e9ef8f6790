mod app;
mod cli;
mod logging;
mod render;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::initialize(cli.log_destination(), cli.log_level());
    app::run_app(cli).await
}
