use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error(transparent)]
	Session(#[from] solarbridge::Error),

	#[error("MQTT error: {0}")]
	Mqtt(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl CliError {
	/// Lifecycle phase for log context.
	pub fn phase(&self) -> &'static str {
		match self {
			CliError::Session(err) => err.phase(),
			CliError::Config(_) => "config",
			CliError::Mqtt(_) => "publish",
			CliError::Io(_) | CliError::Json(_) => "output",
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
