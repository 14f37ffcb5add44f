//! Turns parsed flags into the core's configuration types.

use solarbridge::{BrowserAuthenticator, Credentials, HttpPortal, PortalConfig, SessionManager, SessionStore};
use solarbridge_runtime::LaunchOptions;

use crate::cli::PortalArgs;
use crate::error::{CliError, Result};

pub type PortalSession = SessionManager<HttpPortal, BrowserAuthenticator>;

#[derive(Debug, Clone)]
pub struct AppContext {
	args: PortalArgs,
}

impl AppContext {
	pub fn new(args: PortalArgs) -> Self {
		Self { args }
	}

	pub fn store(&self) -> SessionStore {
		SessionStore::new(&self.args.cookie_file)
	}

	pub fn portal_config(&self) -> PortalConfig {
		PortalConfig {
			portal_url: self.args.portal_url.clone(),
			api_url: self.args.api_url.clone(),
			station_dn: self.args.station_dn.clone(),
			..PortalConfig::default()
		}
	}

	pub fn launch_options(&self) -> LaunchOptions {
		LaunchOptions {
			executable: self.args.chrome.clone(),
			headless: self.args.headless,
			..LaunchOptions::default()
		}
	}

	pub fn credentials(&self) -> Result<Credentials> {
		match (non_empty(&self.args.username), non_empty(&self.args.password)) {
			(Some(username), Some(password)) => Ok(Credentials::new(username, password)),
			_ => Err(CliError::Config(
				"FUSIONSOLAR_USERNAME and FUSIONSOLAR_PASSWORD must be set (or pass --username/--password)".to_string(),
			)),
		}
	}

	pub fn session_manager(&self) -> Result<PortalSession> {
		let credentials = self.credentials()?;
		let config = self.portal_config();
		let authenticator = BrowserAuthenticator::new(config.portal_url.clone(), self.launch_options());
		let station_dn = config.station_dn.clone();
		let portal = HttpPortal::new(config)?;
		Ok(SessionManager::new(credentials, station_dn, self.store(), portal, authenticator))
	}
}

fn non_empty(value: &Option<String>) -> Option<&str> {
	value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	fn args() -> PortalArgs {
		PortalArgs {
			cookie_file: PathBuf::from("/tmp/solarbridge-cookies.json"),
			station_dn: "NE=7".to_string(),
			username: Some("me".to_string()),
			password: Some("pw".to_string()),
			headless: false,
			portal_url: "https://portal.test".to_string(),
			api_url: "https://api.test".to_string(),
			chrome: Some(PathBuf::from("/opt/chromium")),
		}
	}

	#[test]
	fn flags_flow_into_core_configuration() {
		let ctx = AppContext::new(args());
		let config = ctx.portal_config();
		assert_eq!(config.api_url, "https://api.test");
		assert_eq!(config.station_dn, "NE=7");
		assert_eq!(ctx.store().path(), PathBuf::from("/tmp/solarbridge-cookies.json"));

		let launch = ctx.launch_options();
		assert!(!launch.headless);
		assert_eq!(launch.executable, Some(PathBuf::from("/opt/chromium")));

		let manager = ctx.session_manager().unwrap();
		assert_eq!(manager.station_dn(), "NE=7");
		assert!(manager.current().is_empty());
	}

	#[test]
	fn missing_credentials_are_a_config_error() {
		let ctx = AppContext::new(PortalArgs {
			password: Some("  ".to_string()),
			..args()
		});
		let err = ctx.session_manager().err().unwrap();
		assert!(matches!(err, CliError::Config(ref message) if message.contains("FUSIONSOLAR_PASSWORD")));
	}
}
