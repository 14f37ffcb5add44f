use solarbridge::{EnergyFlowResponse, extract_metrics};

use crate::context::AppContext;
use crate::display::render_metrics;
use crate::error::Result;

/// One authenticated fetch, printed as metrics or raw JSON.
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
	let mut manager = ctx.session_manager()?;
	let request = ctx.portal_config().energy_flow_request();
	let body = manager.fetch_authenticated(&request).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&body)?);
		return Ok(());
	}

	let response: EnergyFlowResponse = serde_json::from_value(body)?;
	match extract_metrics(&response) {
		Some(metrics) => println!("{}", render_metrics(&metrics)),
		None => println!("No flow data in response."),
	}
	Ok(())
}
