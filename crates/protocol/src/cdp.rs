//! Chrome DevTools Protocol message envelope and payload subset.
//!
//! Requests carry a sequential `id`; responses echo it, events do not:
//!
//! ```json
//! {"id": 7, "method": "Page.navigate", "params": {"url": "https://example.com"}}
//! {"id": 7, "result": {"frameId": "..."}}
//! {"id": 8, "error": {"code": -32000, "message": "Cannot navigate"}}
//! {"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cookie::{SameSite, SessionToken};

/// Command sent to a DevTools target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpRequest {
	pub id: u32,
	pub method: String,
	pub params: Value,
}

/// Reply correlated to a [`CdpRequest`] by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpResponse {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<CdpErrorPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpErrorPayload {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Unsolicited notification from the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpEvent {
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

/// Discriminated by the presence of `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
	Response(CdpResponse),
	Event(CdpEvent),
}

/// `/json/version` response subset.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpVersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// `/json/list` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpTargetInfo {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub web_socket_debugger_url: Option<String>,
}

impl CdpTargetInfo {
	pub fn is_page(&self) -> bool {
		self.kind == "page"
	}
}

/// `Network.Cookie` as reported by `Network.getAllCookies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpCookie {
	pub name: String,
	pub value: String,
	#[serde(default)]
	pub domain: String,
	#[serde(default)]
	pub path: String,
	/// Unix seconds; `-1` for session cookies.
	#[serde(default)]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub session: bool,
	#[serde(default)]
	pub same_site: Option<String>,
}

impl From<CdpCookie> for SessionToken {
	fn from(cookie: CdpCookie) -> Self {
		let expires_at = match cookie.expires {
			Some(ts) if !cookie.session && ts >= 0.0 => Some(ts),
			_ => None,
		};
		SessionToken {
			name: cookie.name,
			value: cookie.value,
			domain: cookie.domain,
			path: cookie.path,
			expires_at,
			http_only: cookie.http_only,
			secure: cookie.secure,
			same_site: cookie.same_site.as_deref().map(SameSite::parse).unwrap_or_default(),
		}
	}
}

/// `Runtime.evaluate` result subset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default)]
	pub exception_details: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub value: Option<Value>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn message_distinguishes_responses_from_events() {
		let response: CdpMessage = serde_json::from_value(json!({"id": 3, "result": {}})).unwrap();
		assert!(matches!(response, CdpMessage::Response(CdpResponse { id: 3, .. })));

		let event: CdpMessage = serde_json::from_value(json!({"method": "Page.loadEventFired", "params": {"timestamp": 1.0}})).unwrap();
		match event {
			CdpMessage::Event(event) => assert_eq!(event.method, "Page.loadEventFired"),
			other => panic!("expected event, got {other:?}"),
		}
	}

	#[test]
	fn error_response_parses() {
		let response: CdpMessage = serde_json::from_value(json!({"id": 1, "error": {"code": -32000, "message": "boom"}})).unwrap();
		match response {
			CdpMessage::Response(r) => assert_eq!(r.error.unwrap().message, "boom"),
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn session_cookie_loses_expiry() {
		let cookie: CdpCookie = serde_json::from_value(json!({
			"name": "JSESSIONID", "value": "abc", "domain": "example.com", "path": "/",
			"expires": -1, "httpOnly": true, "secure": true, "session": true, "sameSite": "Strict"
		}))
		.unwrap();
		let token = SessionToken::from(cookie);
		assert_eq!(token.expires_at, None);
		assert!(token.http_only);
		assert_eq!(token.same_site, SameSite::Strict);
	}

	#[test]
	fn persistent_cookie_keeps_expiry() {
		let cookie: CdpCookie = serde_json::from_value(json!({
			"name": "dp-session", "value": "x", "expires": 1800000000.0, "session": false
		}))
		.unwrap();
		assert_eq!(SessionToken::from(cookie).expires_at, Some(1800000000.0));
	}
}
