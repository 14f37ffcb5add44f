use solarbridge::Portal;

use crate::context::AppContext;
use crate::error::Result;

pub async fn execute(ctx: &AppContext) -> Result<()> {
	let mut manager = ctx.session_manager()?;
	manager.login().await?;

	let state = manager.current();
	let accepted = manager.portal().validate(&state).await;
	println!("Saved {} cookies to {}", state.len(), manager.store().path().display());
	println!("  {}", state.token_names().join(", "));
	println!("Portal {} the new session.", if accepted { "accepts" } else { "does NOT accept" });
	Ok(())
}
