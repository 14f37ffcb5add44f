use anyhow::Context;
use clap::Parser;
use solarbridge_cli::cli::Cli;
use solarbridge_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "solarbridge", error = format!("{err:#}"), "command failed");
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let name = cli.command_name();
	commands::dispatch(cli).await.with_context(|| format!("{name} failed"))
}
