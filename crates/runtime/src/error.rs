use std::time::Duration;

use thiserror::Error;

/// Errors raised while driving a browser.
#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("could not find a Chrome/Chromium executable; install one or set its path explicitly")]
	ExecutableNotFound,

	#[error("failed to launch browser at {path}: {source}")]
	Launch {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("browser exited before its debugging endpoint became available (status: {0})")]
	Exited(String),

	#[error("debugging endpoint not available on port {port}: {last_error}")]
	EndpointUnavailable { port: u16, last_error: String },

	#[error("no free local port: {0}")]
	NoFreePort(#[source] std::io::Error),

	#[error("debugging endpoint HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("websocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("{method} failed: {message}")]
	Protocol { method: String, message: String },

	#[error("timed out after {after:?} waiting for {what}")]
	Timeout { what: String, after: Duration },

	#[error("DevTools connection closed")]
	ConnectionClosed,

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
