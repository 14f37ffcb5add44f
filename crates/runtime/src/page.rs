//! Page-level operations over a DevTools connection.

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use solarbridge_protocol::{CdpCookie, CdpEvent, EvaluateResult, SessionToken};
use tokio::sync::broadcast;
use tracing::debug;

use crate::connection::CdpConnection;
use crate::error::{Result, RuntimeError};

const LOAD_EVENT: &str = "Page.loadEventFired";
const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// A single browser tab.
pub struct Page {
	conn: CdpConnection,
}

impl Page {
	/// Attaches to a page target and enables the domains used by the login flow.
	///
	/// Every later command fails with a timeout after `command_timeout`.
	pub async fn attach(websocket_url: &str, command_timeout: Duration) -> Result<Self> {
		let conn = CdpConnection::connect(websocket_url).await?.with_command_timeout(command_timeout);
		for domain in ["Page", "Runtime", "Network"] {
			conn.send(&format!("{domain}.enable"), json!({})).await?;
		}
		Ok(Self { conn })
	}

	pub async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
		self.conn
			.send(
				"Emulation.setDeviceMetricsOverride",
				json!({"width": width, "height": height, "deviceScaleFactor": 1, "mobile": false}),
			)
			.await?;
		Ok(())
	}

	/// Starts listening for the next load event; call before triggering navigation.
	pub fn load_waiter(&self) -> LoadWaiter {
		LoadWaiter {
			events: self.conn.subscribe(),
		}
	}

	/// Navigates to `url` and waits for the load event.
	pub async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		let waiter = self.load_waiter();
		let result = self.conn.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(error) = result.get("errorText").and_then(Value::as_str) {
			return Err(RuntimeError::Protocol {
				method: "Page.navigate".to_string(),
				message: format!("{error} ({url})"),
			});
		}
		waiter.wait(timeout).await
	}

	/// Evaluates `expression` and returns its JSON value.
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let raw = self
			.conn
			.send(
				"Runtime.evaluate",
				json!({"expression": expression, "returnByValue": true, "awaitPromise": true}),
			)
			.await?;
		let evaluated: EvaluateResult = serde_json::from_value(raw)?;
		if let Some(details) = evaluated.exception_details {
			let message = details
				.pointer("/exception/description")
				.or_else(|| details.get("text"))
				.map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
				.unwrap_or_else(|| "evaluation threw".to_string());
			return Err(RuntimeError::Protocol {
				method: "Runtime.evaluate".to_string(),
				message,
			});
		}
		Ok(evaluated.result.value.unwrap_or(Value::Null))
	}

	/// Polls until `selector` matches an element or `timeout` elapses.
	pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		let expression = format!("document.querySelector({}) !== null", js_string(selector));
		let started = Instant::now();
		loop {
			if self.evaluate(&expression).await?.as_bool() == Some(true) {
				return Ok(());
			}
			if started.elapsed() >= timeout {
				return Err(RuntimeError::Timeout {
					what: format!("selector {selector}"),
					after: timeout,
				});
			}
			tokio::time::sleep(SELECTOR_POLL).await;
		}
	}

	/// Focuses `selector` and types `text` one key at a time.
	pub async fn type_text(&self, selector: &str, text: &str, key_delay: Duration) -> Result<()> {
		let focus = format!(
			"(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
			js_string(selector)
		);
		if self.evaluate(&focus).await?.as_bool() != Some(true) {
			return Err(RuntimeError::Protocol {
				method: "Runtime.evaluate".to_string(),
				message: format!("no element matches {selector}"),
			});
		}

		for ch in text.chars() {
			let key = ch.to_string();
			self.conn
				.send("Input.dispatchKeyEvent", json!({"type": "keyDown", "text": key, "key": key}))
				.await?;
			self.conn
				.send("Input.dispatchKeyEvent", json!({"type": "keyUp", "key": key}))
				.await?;
			tokio::time::sleep(key_delay).await;
		}
		Ok(())
	}

	/// Clicks the first element matching `selector`; returns `false` when nothing matched.
	pub async fn click(&self, selector: &str) -> Result<bool> {
		let expression = format!(
			"(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
			js_string(selector)
		);
		Ok(self.evaluate(&expression).await?.as_bool() == Some(true))
	}

	pub async fn press_enter(&self) -> Result<()> {
		let key = json!({"key": "Enter", "code": "Enter", "windowsVirtualKeyCode": 13, "nativeVirtualKeyCode": 13});
		let mut down = key.clone();
		down["type"] = json!("keyDown");
		down["text"] = json!("\r");
		let mut up = key;
		up["type"] = json!("keyUp");
		self.conn.send("Input.dispatchKeyEvent", down).await?;
		self.conn.send("Input.dispatchKeyEvent", up).await?;
		Ok(())
	}

	pub async fn url(&self) -> Result<String> {
		Ok(self.evaluate("location.href").await?.as_str().unwrap_or_default().to_string())
	}

	/// Returns every cookie in the browser profile.
	pub async fn cookies(&self) -> Result<Vec<SessionToken>> {
		let raw = self.conn.send("Network.getAllCookies", json!({})).await?;
		let cookies: Vec<CdpCookie> = match raw.get("cookies") {
			Some(list) => serde_json::from_value(list.clone())?,
			None => Vec::new(),
		};
		debug!(target = "solarbridge.browser", count = cookies.len(), "harvested cookies");
		Ok(cookies.into_iter().map(SessionToken::from).collect())
	}

	pub async fn close(self) {
		self.conn.close().await;
	}
}

/// Pending wait for the next `Page.loadEventFired`.
pub struct LoadWaiter {
	events: broadcast::Receiver<CdpEvent>,
}

impl LoadWaiter {
	pub async fn wait(mut self, timeout: Duration) -> Result<()> {
		let wait = async {
			loop {
				match self.events.recv().await {
					Ok(event) if event.method == LOAD_EVENT => return Ok(()),
					Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
					Err(broadcast::error::RecvError::Closed) => return Err(RuntimeError::ConnectionClosed),
				}
			}
		};
		tokio::time::timeout(timeout, wait).await.map_err(|_| RuntimeError::Timeout {
			what: "page load".to_string(),
			after: timeout,
		})?
	}
}

/// Quotes `raw` as a JavaScript string literal.
fn js_string(raw: &str) -> String {
	Value::String(raw.to_string()).to_string()
}
