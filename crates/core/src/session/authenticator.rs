//! Interactive login through a real browser.
//!
//! The portal only issues session tokens to its login form, so login launches a
//! throwaway Chromium profile, fills the form, and harvests every cookie the
//! browser holds afterwards.

use std::time::Duration;

use async_trait::async_trait;
use solarbridge_runtime::{BrowserProcess, LaunchOptions, Page, RuntimeError};
use tracing::{debug, info};

use super::state::{Credentials, SessionState};
use crate::error::AuthError;

/// Produces a fresh token set from credentials.
///
/// A login is all-or-nothing: callers retry the whole call, never a step.
#[async_trait]
pub trait Authenticator: Send + Sync {
	async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError>;
}

/// Login page location, selectors, and every bounded wait of the flow.
#[derive(Debug, Clone)]
pub struct LoginForm {
	pub login_path: String,
	pub username_selector: String,
	pub password_selector: String,
	/// Clicked when it matches; otherwise Enter is pressed in the password field.
	pub submit_selector: String,
	/// Emulated page size, matching a desktop browser window.
	pub viewport: (u32, u32),
	pub navigation_timeout: Duration,
	pub form_timeout: Duration,
	pub settle_timeout: Duration,
	/// Upper bound on waiting for the post-submit load event.
	pub fallback_wait: Duration,
	pub settle_delay: Duration,
	pub key_delay: Duration,
	pub pause_before_typing: Duration,
	pub pause_between_fields: Duration,
	pub pause_before_submit: Duration,
}

impl Default for LoginForm {
	fn default() -> Self {
		Self {
			login_path: "/unisso/login.action".to_string(),
			username_selector: "#username".to_string(),
			password_selector: "#value".to_string(),
			submit_selector: r#"button[type="submit"], input[type="submit"], #btn_submit, .login-btn"#.to_string(),
			viewport: (1920, 1080),
			navigation_timeout: Duration::from_secs(30),
			form_timeout: Duration::from_secs(15),
			settle_timeout: Duration::from_secs(15),
			fallback_wait: Duration::from_secs(5),
			settle_delay: Duration::from_secs(3),
			key_delay: Duration::from_millis(50),
			pause_before_typing: Duration::from_secs(1),
			pause_between_fields: Duration::from_millis(500),
			pause_before_submit: Duration::from_secs(1),
		}
	}
}

impl LoginForm {
	pub fn login_url(&self, portal_url: &str) -> String {
		format!("{}{}", portal_url.trim_end_matches('/'), self.login_path)
	}

	/// Runs the form flow on an attached page and harvests its cookies.
	pub async fn submit(&self, page: &Page, login_url: &str, credentials: &Credentials) -> Result<SessionState, AuthError> {
		let (width, height) = self.viewport;
		page.set_viewport(width, height).await.map_err(AuthError::Browser)?;
		page.goto(login_url, self.navigation_timeout).await.map_err(AuthError::Browser)?;
		debug!(target = "solarbridge.browser", phase = "login", "login page loaded");

		page.wait_for_selector(&self.username_selector, self.form_timeout)
			.await
			.map_err(|err| match err {
				RuntimeError::Timeout { after, .. } => AuthError::FormNotReady {
					selector: self.username_selector.clone(),
					waited: after,
				},
				other => AuthError::Browser(other),
			})?;
		tokio::time::sleep(self.pause_before_typing).await;

		page.type_text(&self.username_selector, credentials.username(), self.key_delay)
			.await
			.map_err(AuthError::Browser)?;
		tokio::time::sleep(self.pause_between_fields).await;
		page.type_text(&self.password_selector, credentials.password(), self.key_delay)
			.await
			.map_err(AuthError::Browser)?;
		tokio::time::sleep(self.pause_before_submit).await;

		let navigation = page.load_waiter();
		if page.click(&self.submit_selector).await.map_err(AuthError::Browser)? {
			debug!(target = "solarbridge.browser", phase = "login", "submit clicked");
		} else {
			debug!(target = "solarbridge.browser", phase = "login", "no submit control; pressing Enter");
			page.press_enter().await.map_err(AuthError::Browser)?;
		}

		tokio::select! {
			loaded = navigation.wait(self.settle_timeout) => {
				if let Err(err) = loaded {
					debug!(target = "solarbridge.browser", phase = "login", error = %err, "no navigation after submit");
				}
			}
			_ = tokio::time::sleep(self.fallback_wait) => {
				debug!(target = "solarbridge.browser", phase = "login", "post-submit fallback wait elapsed");
			}
		}
		tokio::time::sleep(self.settle_delay).await;

		if let Ok(url) = page.url().await {
			debug!(target = "solarbridge.browser", phase = "login", %url, "post-login location");
		}

		let tokens = page.cookies().await.map_err(AuthError::Browser)?;
		if tokens.is_empty() {
			return Err(AuthError::NoTokens);
		}
		let state = SessionState::new(tokens);
		info!(target = "solarbridge.session", phase = "login", count = state.len(), names = ?state.token_names(), "login harvested tokens");
		Ok(state)
	}
}

/// [`Authenticator`] backed by a locally launched Chromium.
#[derive(Debug, Clone)]
pub struct BrowserAuthenticator {
	launch: LaunchOptions,
	form: LoginForm,
	portal_url: String,
}

impl BrowserAuthenticator {
	pub fn new(portal_url: impl Into<String>, launch: LaunchOptions) -> Self {
		Self {
			launch,
			form: LoginForm::default(),
			portal_url: portal_url.into(),
		}
	}

	pub fn with_form(mut self, form: LoginForm) -> Self {
		self.form = form;
		self
	}

	pub fn form(&self) -> &LoginForm {
		&self.form
	}
}

#[async_trait]
impl Authenticator for BrowserAuthenticator {
	async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
		let login_url = self.form.login_url(&self.portal_url);
		info!(target = "solarbridge.session", phase = "login", url = %login_url, headless = self.launch.headless, "starting interactive login");

		let browser = BrowserProcess::launch(&self.launch).await.map_err(AuthError::Launch)?;
		let result = match browser.open_page().await {
			Ok(page) => {
				let result = self.form.submit(&page, &login_url, credentials).await;
				page.close().await;
				result
			}
			Err(err) => Err(AuthError::Browser(err)),
		};
		browser.close().await;
		result
	}
}
