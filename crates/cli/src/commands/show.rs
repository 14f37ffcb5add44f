use crate::context::AppContext;
use crate::display::{render_session, unix_now};
use crate::error::Result;

pub fn execute(ctx: &AppContext) -> Result<()> {
	let store = ctx.store();
	if !store.path().exists() {
		println!("No session file at {}", store.path().display());
		return Ok(());
	}

	let state = store.load();
	println!("{}", render_session(&store.path().display().to_string(), &state, unix_now()));
	Ok(())
}
