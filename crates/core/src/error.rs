use std::path::PathBuf;
use std::time::Duration;

use solarbridge_runtime::RuntimeError;
use thiserror::Error;

/// Why an interactive login could not produce a session.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("login form field {selector} not ready after {waited:?}")]
	FormNotReady { selector: String, waited: Duration },

	#[error("could not start the automation browser: {0}")]
	Launch(#[source] RuntimeError),

	#[error("browser automation failed: {0}")]
	Browser(#[source] RuntimeError),

	#[error("login flow completed but yielded no session tokens")]
	NoTokens,
}

/// Why a portal request was not usable.
#[derive(Debug, Error)]
pub enum RequestError {
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("portal rejected the request with status {status}")]
	Rejected { status: u16 },

	#[error("portal returned an error payload: {0}")]
	ErrorPayload(String),

	#[error("could not decode portal response: {0}")]
	Decode(String),

	#[error("session tokens cannot be sent as a header: {0}")]
	InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("session storage error at {}: {source}", path.display())]
	Storage {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("interactive login failed: {0}")]
	Auth(#[from] AuthError),

	#[error("login completed but session validation failed")]
	SessionEstablishment,

	#[error("request failed after session recovery: {0}")]
	Request(#[from] RequestError),

	#[error("failed to build HTTP client: {0}")]
	Client(String),

	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	/// Lifecycle phase the error belongs to, for log context.
	pub fn phase(&self) -> &'static str {
		match self {
			Error::Storage { .. } => "store",
			Error::Auth(_) => "login",
			Error::SessionEstablishment => "validate",
			Error::Request(_) => "request",
			Error::Client(_) | Error::Config(_) => "config",
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
