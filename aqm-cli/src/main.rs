//! AQM CLI - explore London air quality sensor readings from the command line.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "aqm-cli",
    version,
    about = "London air quality sensor toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: aqm_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("[AQM] cli: {:?}", cli.command);
    aqm_cmd::run(cli.command).await
}
