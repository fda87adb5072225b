//! EKRAF CLI - query, export and import creative-economy investment data.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ekraf-cli",
    version,
    about = "West Java creative-economy data toolkit"
)]
struct Cli {
    #[command(flatten)]
    backend: ekraf_cmd::BackendArgs,

    #[command(subcommand)]
    command: ekraf_cmd::Command,
}

// The local database is single-threaded, so everything runs on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    ekraf_cmd::run(&cli.backend, cli.command).await
}
