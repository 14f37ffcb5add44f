use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, redirect};
use serde_json::Value;
use solarbridge_protocol::error_marker;
use tracing::{debug, info, warn};

use super::{Portal, PortalConfig, PortalRequest};
use crate::error::{Error, RequestError, Result};
use crate::session::SessionState;

const USER_AGENT: &str =
	"Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// [`Portal`] over HTTPS with the portal's browser-like header set.
///
/// Redirects are never followed: the portal answers expired sessions with a
/// redirect to its login page.
#[derive(Debug, Clone)]
pub struct HttpPortal {
	client: Client,
	config: PortalConfig,
}

impl HttpPortal {
	pub fn new(config: PortalConfig) -> Result<Self> {
		let mut headers = HeaderMap::new();
		headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
		headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

		let client = Client::builder()
			.user_agent(USER_AGENT)
			.default_headers(headers)
			.redirect(redirect::Policy::none())
			.timeout(config.request_timeout)
			.connect_timeout(config.connect_timeout)
			.build()
			.map_err(|err| Error::Client(err.to_string()))?;

		Ok(Self { client, config })
	}

	pub fn config(&self) -> &PortalConfig {
		&self.config
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
	}

	fn get(&self, request: &PortalRequest, state: &SessionState) -> std::result::Result<reqwest::RequestBuilder, RequestError> {
		let mut builder = self.client.get(self.url(&request.path)).query(&request.query);
		if !state.is_empty() {
			builder = builder.header(COOKIE, HeaderValue::from_str(state.cookie_header())?);
		}
		Ok(builder.header(REFERER, self.config.portal_url.as_str()))
	}
}

#[async_trait]
impl Portal for HttpPortal {
	async fn validate(&self, state: &SessionState) -> bool {
		if state.is_empty() {
			debug!(target = "solarbridge.portal", phase = "validate", "no tokens; session invalid");
			return false;
		}

		match self.get_json(&self.config.energy_flow_request(), state).await {
			Ok(_) => {
				debug!(target = "solarbridge.portal", phase = "validate", count = state.len(), "session accepted");
				true
			}
			Err(err) => {
				info!(target = "solarbridge.portal", phase = "validate", error = %err, "session rejected");
				false
			}
		}
	}

	async fn keep_alive(&self, state: &SessionState) -> bool {
		if state.is_empty() {
			return false;
		}
		let request = PortalRequest::keep_alive();
		let builder = match self.get(&request, state) {
			Ok(builder) => builder,
			Err(err) => {
				warn!(target = "solarbridge.portal", phase = "keepalive", error = %err, "keep-alive skipped");
				return false;
			}
		};

		match builder.send().await {
			Ok(response) if response.status().is_success() => {
				let status = response.status().as_u16();
				// Non-JSON bodies are acceptable; only an explicit error marker fails.
				let marker = match response.bytes().await {
					Ok(bytes) => serde_json::from_slice::<Value>(&bytes).ok().and_then(|body| error_marker(&body)),
					Err(err) => Some(err.to_string()),
				};
				match marker {
					None => {
						debug!(target = "solarbridge.portal", phase = "keepalive", status, "keep-alive ok");
						true
					}
					Some(marker) => {
						debug!(target = "solarbridge.portal", phase = "keepalive", status, error = %marker, "keep-alive not accepted");
						false
					}
				}
			}
			Ok(response) => {
				debug!(target = "solarbridge.portal", phase = "keepalive", status = response.status().as_u16(), "keep-alive not accepted");
				false
			}
			Err(err) => {
				warn!(target = "solarbridge.portal", phase = "keepalive", error = %err, "keep-alive failed");
				false
			}
		}
	}

	async fn get_json(&self, request: &PortalRequest, state: &SessionState) -> std::result::Result<Value, RequestError> {
		let response = self.get(request, state)?.send().await?;

		let status = response.status();
		if !status.is_success() {
			return Err(RequestError::Rejected { status: status.as_u16() });
		}

		let bytes = response.bytes().await?;
		let body: Value = serde_json::from_slice(&bytes).map_err(|err| RequestError::Decode(err.to_string()))?;
		if let Some(marker) = error_marker(&body) {
			return Err(RequestError::ErrorPayload(marker));
		}
		debug!(target = "solarbridge.portal", phase = "request", path = %request.path, status = status.as_u16(), "request ok");
		Ok(body)
	}
}
