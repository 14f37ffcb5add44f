//! Session token (cookie) wire format.
//!
//! The persisted session file is a JSON array of [`SessionToken`] objects:
//!
//! ```json
//! [
//!   {
//!     "name": "JSESSIONID",
//!     "value": "...",
//!     "domain": ".fusionsolar.huawei.com",
//!     "path": "/",
//!     "expires": 1767225600.0,
//!     "httpOnly": true,
//!     "secure": true,
//!     "sameSite": "Lax"
//!   }
//! ]
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SameSite {
	Strict,
	Lax,
	None,
	/// Attribute absent or unrecognised; never serialized.
	#[default]
	Unset,
}

impl SameSite {
	/// Parses the attribute case-insensitively, mapping unknown values to [`SameSite::Unset`].
	pub fn parse(raw: &str) -> Self {
		match raw.to_ascii_lowercase().as_str() {
			"strict" => Self::Strict,
			"lax" => Self::Lax,
			"none" => Self::None,
			_ => Self::Unset,
		}
	}

	pub fn is_unset(&self) -> bool {
		matches!(self, Self::Unset)
	}
}

fn lenient_same_site<'de, D>(deserializer: D) -> Result<SameSite, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;
	Ok(raw.as_deref().map(SameSite::parse).unwrap_or_default())
}

/// One authentication artifact harvested from the portal login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
	pub name: String,
	pub value: String,
	#[serde(default)]
	pub domain: String,
	#[serde(default)]
	pub path: String,
	/// Absolute expiry as unix seconds; `None` for session cookies.
	#[serde(default, rename = "expires", skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default, deserialize_with = "lenient_same_site", skip_serializing_if = "SameSite::is_unset")]
	pub same_site: SameSite,
}

impl SessionToken {
	/// Creates a host-agnostic token with only a name and value.
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: String::new(),
			path: "/".to_string(),
			expires_at: None,
			http_only: false,
			secure: false,
			same_site: SameSite::Unset,
		}
	}

	/// Returns `true` when the token carries an expiry at or before `now` (unix seconds).
	///
	/// Negative expiries mark session cookies and never expire.
	pub fn is_expired(&self, now: f64) -> bool {
		self.expires_at.is_some_and(|ts| ts >= 0.0 && ts <= now)
	}
}

/// Joins tokens into a `Cookie` header value: `name=value; name=value`.
pub fn cookie_header(tokens: &[SessionToken]) -> String {
	tokens
		.iter()
		.map(|token| format!("{}={}", token.name, token.value))
		.collect::<Vec<_>>()
		.join("; ")
}
