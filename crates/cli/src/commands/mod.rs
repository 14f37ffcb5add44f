mod fetch;
mod login;
mod logout;
mod run;
mod show;

use crate::cli::{Cli, Commands, RunArgs};
use crate::context::AppContext;
use crate::error::{CliError, Result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let ctx = AppContext::new(cli.portal);

	match cli.command {
		Some(Commands::Run(args)) => run::execute(&ctx, &args).await,
		None => {
			let args = RunArgs::from_env().map_err(|err| CliError::Config(err.to_string()))?;
			run::execute(&ctx, &args).await
		}
		Some(Commands::Fetch { json }) => fetch::execute(&ctx, json).await,
		Some(Commands::Login) => login::execute(&ctx).await,
		Some(Commands::Logout) => logout::execute(&ctx).map(|_| ()),
		Some(Commands::Show) => show::execute(&ctx),
	}
}
