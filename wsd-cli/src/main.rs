//! WSD CLI - water surface detection dashboard launcher.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "wsd-cli",
    version,
    about = "Water surface detection dashboard for wetland sites"
)]
struct Cli {
    #[command(subcommand)]
    command: wsd_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    wsd_cmd::run(cli.command).await
}
