//! Portal boundary: session validation, keep-alive, and business requests.

mod client;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use client::HttpPortal;

use crate::error::RequestError;
use crate::session::SessionState;

pub const DEFAULT_PORTAL_URL: &str = "https://eu5.fusionsolar.huawei.com";
pub const DEFAULT_API_URL: &str = "https://uni004eu5.fusionsolar.huawei.com";

const ENERGY_FLOW_PATH: &str = "/rest/pvms/web/station/v3/overview/energy-flow";
const KEEP_ALIVE_PATH: &str = "/rest/dpcloud/auth/v1/keep-alive";
const ENERGY_FLOW_FEATURE: &str = "aifc";

/// Everything the session lifecycle needs from the remote portal.
#[async_trait]
pub trait Portal: Send + Sync {
	/// Whether the portal still accepts `state`. Never errors; faults read as `false`.
	async fn validate(&self, state: &SessionState) -> bool;

	/// Best-effort TTL extension. The result is advisory only.
	async fn keep_alive(&self, state: &SessionState) -> bool;

	/// Issues an authenticated GET and returns the decoded JSON body.
	async fn get_json(&self, request: &PortalRequest, state: &SessionState) -> Result<Value, RequestError>;
}

/// A GET against the business API, relative to [`PortalConfig::api_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
	pub path: String,
	pub query: Vec<(String, String)>,
}

impl PortalRequest {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			query: Vec::new(),
		}
	}

	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));
		self
	}

	/// Energy-flow snapshot for one station. Also the validation probe.
	pub fn energy_flow(station_dn: &str) -> Self {
		Self::new(ENERGY_FLOW_PATH)
			.query("stationDn", station_dn)
			.query("featureId", ENERGY_FLOW_FEATURE)
	}

	pub fn keep_alive() -> Self {
		Self::new(KEEP_ALIVE_PATH)
	}
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
	/// Interactive portal origin; sent as `Referer` and used for login.
	pub portal_url: String,
	/// Business API origin.
	pub api_url: String,
	pub station_dn: String,
	pub request_timeout: Duration,
	pub connect_timeout: Duration,
}

impl Default for PortalConfig {
	fn default() -> Self {
		Self {
			portal_url: DEFAULT_PORTAL_URL.to_string(),
			api_url: DEFAULT_API_URL.to_string(),
			station_dn: "NE=XXXXXXXXXXXX".to_string(),
			request_timeout: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(10),
		}
	}
}

impl PortalConfig {
	pub fn energy_flow_request(&self) -> PortalRequest {
		PortalRequest::energy_flow(&self.station_dn)
	}
}
