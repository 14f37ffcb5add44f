use tracing::info;

use crate::context::AppContext;
use crate::error::Result;

/// Deletes the persisted session so the next run logs in from scratch.
///
/// Returns whether a session file was removed.
pub fn execute(ctx: &AppContext) -> Result<bool> {
	let store = ctx.store();
	let removed = store.clear()?;
	if removed {
		info!(target = "solarbridge.session", phase = "store", path = %store.path().display(), "session file removed");
		println!("Removed session file {}", store.path().display());
	} else {
		println!("No session file at {}", store.path().display());
	}
	Ok(removed)
}
