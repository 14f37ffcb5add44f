use std::fmt;

use solarbridge_protocol::{SessionToken, cookie_header};

/// The current token generation plus its derived `Cookie` header.
///
/// Built once from a complete token set and never mutated; a new login produces
/// a new value that replaces the old one wholesale.
#[derive(Clone, Default, PartialEq)]
pub struct SessionState {
	tokens: Vec<SessionToken>,
	cookie_header: String,
}

impl SessionState {
	pub fn new(tokens: Vec<SessionToken>) -> Self {
		let cookie_header = cookie_header(&tokens);
		Self { tokens, cookie_header }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn tokens(&self) -> &[SessionToken] {
		&self.tokens
	}

	pub fn cookie_header(&self) -> &str {
		&self.cookie_header
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Token names only, safe for logs.
	pub fn token_names(&self) -> Vec<&str> {
		self.tokens.iter().map(|t| t.name.as_str()).collect()
	}
}

// Values never reach logs.
impl fmt::Debug for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionState").field("tokens", &self.token_names()).finish()
	}
}

/// Portal login credentials. Never persisted, never logged.
#[derive(Clone)]
pub struct Credentials {
	username: String,
	password: String,
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
		}
	}

	pub fn username(&self) -> &str {
		&self.username
	}

	pub fn password(&self) -> &str {
		&self.password
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &"<redacted>")
			.field("password", &"<redacted>")
			.finish()
	}
}
