//! DevTools HTTP endpoint probing and target discovery.

use std::time::Duration;

use solarbridge_protocol::{CdpTargetInfo, CdpVersionInfo};

use crate::error::{Result, RuntimeError};

const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

fn probe_client() -> Result<reqwest::Client> {
	Ok(reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?)
}

fn base_urls(port: u16) -> [String; 2] {
	[format!("http://127.0.0.1:{port}"), format!("http://localhost:{port}")]
}

/// Resolves `/json/version` metadata on `port`.
pub async fn fetch_version(port: u16) -> Result<CdpVersionInfo> {
	let client = probe_client()?;
	let mut last_error = "no response".to_string();

	for base in base_urls(port) {
		let response = match client.get(format!("{base}/json/version")).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		return Ok(response.json().await?);
	}

	Err(RuntimeError::EndpointUnavailable { port, last_error })
}

/// Lists debuggable targets on `port`.
pub async fn list_targets(port: u16) -> Result<Vec<CdpTargetInfo>> {
	let client = probe_client()?;
	let [base, _] = base_urls(port);
	let targets = client
		.get(format!("{base}/json/list"))
		.send()
		.await?
		.error_for_status()?
		.json()
		.await?;
	Ok(targets)
}

/// Opens a blank page target on `port`.
pub async fn new_page_target(port: u16) -> Result<CdpTargetInfo> {
	let client = probe_client()?;
	let [base, _] = base_urls(port);
	let target = client
		.put(format!("{base}/json/new?about:blank"))
		.send()
		.await?
		.error_for_status()?
		.json()
		.await?;
	Ok(target)
}

/// Returns the websocket URL of the first page target, creating one when none exists.
pub async fn page_websocket_url(port: u16) -> Result<String> {
	let existing = list_targets(port).await?.into_iter().find(CdpTargetInfo::is_page);
	let target = match existing {
		Some(target) => target,
		None => new_page_target(port).await?,
	};

	target.web_socket_debugger_url.ok_or_else(|| RuntimeError::Protocol {
		method: "/json/list".to_string(),
		message: format!("target {} exposes no websocket URL", target.id),
	})
}
