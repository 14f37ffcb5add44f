//! Session lifecycle orchestration.
//!
//! ```text
//! NoSession -> Loaded -> Validated
//!                  \-> Invalid -> Authenticating -> Validated | Failed
//! ```
//!
//! The manager owns the current [`SessionState`] behind an `Arc` and swaps the
//! whole reference on every transition. Calls take `&mut self`, so one manager
//! never runs overlapping `ensure_session`/`fetch_authenticated` calls.

use std::sync::Arc;

use serde_json::Value;
use solarbridge_protocol::EnergyFlowResponse;
use tracing::{debug, error, info, warn};

use super::authenticator::Authenticator;
use super::state::{Credentials, SessionState};
use super::store::SessionStore;
use crate::error::{Error, RequestError, Result};
use crate::portal::{Portal, PortalRequest};

pub struct SessionManager<P, A> {
	credentials: Credentials,
	station_dn: String,
	store: SessionStore,
	portal: P,
	authenticator: A,
	state: Arc<SessionState>,
}

impl<P: Portal, A: Authenticator> SessionManager<P, A> {
	pub fn new(credentials: Credentials, station_dn: impl Into<String>, store: SessionStore, portal: P, authenticator: A) -> Self {
		Self {
			credentials,
			station_dn: station_dn.into(),
			store,
			portal,
			authenticator,
			state: Arc::new(SessionState::empty()),
		}
	}

	/// Snapshot of the current token generation.
	pub fn current(&self) -> Arc<SessionState> {
		Arc::clone(&self.state)
	}

	pub fn portal(&self) -> &P {
		&self.portal
	}

	pub fn store(&self) -> &SessionStore {
		&self.store
	}

	pub fn station_dn(&self) -> &str {
		&self.station_dn
	}

	/// Guarantees a session the portal accepts, logging in only when needed.
	///
	/// A stored session costs one validation probe. An empty store goes straight
	/// to login. The fresh tokens are persisted and must validate or the call
	/// fails with [`Error::SessionEstablishment`].
	pub async fn ensure_session(&mut self) -> Result<()> {
		let loaded = self.store.load();
		self.replace(loaded);

		if self.state.is_empty() {
			debug!(target = "solarbridge.session", phase = "load", "no stored session");
		} else if self.portal.validate(&self.state).await {
			debug!(target = "solarbridge.session", phase = "validate", count = self.state.len(), "session valid");
			return Ok(());
		}

		info!(target = "solarbridge.session", phase = "validate", "no usable session; logging in");
		self.login().await?;

		if self.portal.validate(&self.state).await {
			info!(target = "solarbridge.session", phase = "validate", "fresh session accepted");
			Ok(())
		} else {
			error!(target = "solarbridge.session", phase = "validate", "fresh session rejected by portal");
			Err(Error::SessionEstablishment)
		}
	}

	/// Forces an interactive login and persists the resulting tokens.
	///
	/// A failed save is logged and ignored: the in-memory session stays usable.
	pub async fn login(&mut self) -> Result<()> {
		let fresh = self.authenticator.login(&self.credentials).await.inspect_err(|err| {
			error!(target = "solarbridge.session", phase = "login", error = %err, "interactive login failed");
		})?;

		if let Err(err) = self.store.save(&fresh) {
			warn!(target = "solarbridge.session", phase = "store", error = %err, "could not persist session; continuing in memory");
		}
		self.replace(fresh);
		Ok(())
	}

	/// Issues `request` with a valid session, recovering once from rejection.
	///
	/// On the first failure the current tokens are discarded without being
	/// revalidated, one login runs, and the request is retried once. A second
	/// failure is returned as-is.
	pub async fn fetch_authenticated(&mut self, request: &PortalRequest) -> Result<Value> {
		self.ensure_session().await?;

		if !self.portal.keep_alive(&self.state).await {
			debug!(target = "solarbridge.session", phase = "keepalive", "keep-alive not acknowledged");
		}

		let first = match self.portal.get_json(request, &self.state).await {
			Ok(body) => return Ok(body),
			Err(err) => err,
		};
		warn!(target = "solarbridge.session", phase = "request", path = %request.path, error = %first, "request failed; re-authenticating once");

		self.replace(SessionState::empty());
		self.login().await?;

		self.portal.get_json(request, &self.state).await.map_err(|err: RequestError| {
			error!(target = "solarbridge.session", phase = "request", path = %request.path, error = %err, "request failed after recovery");
			Error::Request(err)
		})
	}

	/// Data fetcher for the configured station's energy-flow snapshot.
	pub async fn fetch_energy_flow(&mut self) -> Result<EnergyFlowResponse> {
		let request = PortalRequest::energy_flow(&self.station_dn);
		let body = self.fetch_authenticated(&request).await?;
		serde_json::from_value(body).map_err(|err| Error::Request(RequestError::Decode(err.to_string())))
	}

	fn replace(&mut self, state: SessionState) {
		self.state = Arc::new(state);
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use parking_lot::Mutex;
	use serde_json::json;
	use solarbridge_protocol::SessionToken;
	use tempfile::TempDir;

	use super::*;
	use crate::error::AuthError;

	fn tokens(pairs: &[(&str, &str)]) -> SessionState {
		SessionState::new(pairs.iter().map(|(n, v)| SessionToken::new(*n, *v)).collect())
	}

	/// Portal whose answers are scripted per call and whose calls are counted.
	#[derive(Default)]
	struct FakePortal {
		validations: AtomicUsize,
		keep_alives: AtomicUsize,
		requests: AtomicUsize,
		/// Validation answers in order; `default_valid` once exhausted.
		valid: Mutex<VecDeque<bool>>,
		default_valid: bool,
		responses: Mutex<VecDeque<std::result::Result<Value, RequestError>>>,
		/// Cookie header seen by each validation and request.
		headers: Mutex<Vec<String>>,
	}

	impl FakePortal {
		fn validating(default_valid: bool) -> Self {
			Self {
				default_valid,
				..Self::default()
			}
		}

		fn then_valid(self, answers: &[bool]) -> Self {
			self.valid.lock().extend(answers.iter().copied());
			self
		}

		fn respond(self, response: std::result::Result<Value, RequestError>) -> Self {
			self.responses.lock().push_back(response);
			self
		}
	}

	#[async_trait]
	impl Portal for Arc<FakePortal> {
		async fn validate(&self, state: &SessionState) -> bool {
			if state.is_empty() {
				return false;
			}
			self.validations.fetch_add(1, Ordering::SeqCst);
			self.headers.lock().push(state.cookie_header().to_string());
			self.valid.lock().pop_front().unwrap_or(self.default_valid)
		}

		async fn keep_alive(&self, _state: &SessionState) -> bool {
			self.keep_alives.fetch_add(1, Ordering::SeqCst);
			true
		}

		async fn get_json(&self, _request: &PortalRequest, state: &SessionState) -> std::result::Result<Value, RequestError> {
			self.requests.fetch_add(1, Ordering::SeqCst);
			self.headers.lock().push(state.cookie_header().to_string());
			self.responses.lock().pop_front().unwrap_or_else(|| Ok(json!({"data": {}})))
		}
	}

	/// Authenticator returning scripted token generations.
	#[derive(Default)]
	struct FakeAuthenticator {
		logins: AtomicUsize,
		generations: Mutex<VecDeque<std::result::Result<SessionState, AuthError>>>,
	}

	impl FakeAuthenticator {
		fn yielding(generations: Vec<std::result::Result<SessionState, AuthError>>) -> Self {
			Self {
				logins: AtomicUsize::new(0),
				generations: Mutex::new(generations.into()),
			}
		}
	}

	#[async_trait]
	impl Authenticator for Arc<FakeAuthenticator> {
		async fn login(&self, _credentials: &Credentials) -> std::result::Result<SessionState, AuthError> {
			self.logins.fetch_add(1, Ordering::SeqCst);
			self.generations.lock().pop_front().unwrap_or(Err(AuthError::NoTokens))
		}
	}

	struct Harness {
		_temp: TempDir,
		store: SessionStore,
		portal: Arc<FakePortal>,
		auth: Arc<FakeAuthenticator>,
	}

	impl Harness {
		fn new(portal: FakePortal, auth: FakeAuthenticator) -> Self {
			let temp = TempDir::new().unwrap();
			let store = SessionStore::new(temp.path().join("cookies.json"));
			Self {
				_temp: temp,
				store,
				portal: Arc::new(portal),
				auth: Arc::new(auth),
			}
		}

		fn manager(&self) -> SessionManager<Arc<FakePortal>, Arc<FakeAuthenticator>> {
			SessionManager::new(
				Credentials::new("user", "secret"),
				"NE=1",
				self.store.clone(),
				Arc::clone(&self.portal),
				Arc::clone(&self.auth),
			)
		}

		fn validations(&self) -> usize {
			self.portal.validations.load(Ordering::SeqCst)
		}

		fn logins(&self) -> usize {
			self.auth.logins.load(Ordering::SeqCst)
		}

		fn requests(&self) -> usize {
			self.portal.requests.load(Ordering::SeqCst)
		}
	}

	#[tokio::test]
	async fn valid_stored_session_costs_one_probe_per_call() {
		let h = Harness::new(FakePortal::validating(true), FakeAuthenticator::default());
		h.store.save(&tokens(&[("s", "stored")])).unwrap();
		let mut manager = h.manager();

		for _ in 0..5 {
			manager.ensure_session().await.unwrap();
		}

		assert_eq!(h.validations(), 5);
		assert_eq!(h.logins(), 0);
		assert_eq!(manager.current().cookie_header(), "s=stored");
	}

	#[tokio::test]
	async fn empty_store_goes_straight_to_login() {
		let h = Harness::new(
			FakePortal::validating(true),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "fresh")]))]),
		);
		let mut manager = h.manager();

		manager.ensure_session().await.unwrap();

		assert_eq!(h.logins(), 1);
		assert_eq!(h.validations(), 1);
		assert_eq!(*h.portal.headers.lock(), ["s=fresh"]);
		assert_eq!(h.store.load().cookie_header(), "s=fresh");
	}

	#[tokio::test]
	async fn replaced_session_is_persisted_without_merging() {
		let h = Harness::new(
			FakePortal::validating(true).then_valid(&[false]),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "new")]))]),
		);
		h.store.save(&tokens(&[("s", "old")])).unwrap();
		let mut manager = h.manager();

		manager.ensure_session().await.unwrap();

		let persisted = h.store.load();
		assert_eq!(persisted.len(), 1);
		assert_eq!(persisted.tokens()[0].value, "new");
		assert_eq!(*h.portal.headers.lock(), ["s=old", "s=new"]);
		assert_eq!(h.logins(), 1);
	}

	#[tokio::test]
	async fn rejected_fresh_session_is_an_establishment_error() {
		let h = Harness::new(
			FakePortal::validating(false),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "fresh")]))]),
		);
		let mut manager = h.manager();

		let err = manager.ensure_session().await.unwrap_err();

		assert!(matches!(err, Error::SessionEstablishment));
		assert_eq!(h.logins(), 1);
		assert_eq!(h.validations(), 1);
	}

	#[tokio::test]
	async fn login_failure_propagates_as_auth_error() {
		let h = Harness::new(FakePortal::validating(true), FakeAuthenticator::yielding(vec![Err(AuthError::NoTokens)]));
		let mut manager = h.manager();

		let err = manager.ensure_session().await.unwrap_err();

		assert!(matches!(err, Error::Auth(AuthError::NoTokens)));
		assert_eq!(h.validations(), 0);
		assert!(h.store.load().is_empty());
	}

	#[tokio::test]
	async fn fetch_fires_keep_alive_and_returns_body() {
		let h = Harness::new(
			FakePortal::validating(true).respond(Ok(json!({"data": {"flow": {}}}))),
			FakeAuthenticator::default(),
		);
		h.store.save(&tokens(&[("s", "stored")])).unwrap();
		let mut manager = h.manager();

		let body = manager.fetch_authenticated(&PortalRequest::energy_flow("NE=1")).await.unwrap();

		assert_eq!(body, json!({"data": {"flow": {}}}));
		assert_eq!(h.portal.keep_alives.load(Ordering::SeqCst), 1);
		assert_eq!(h.requests(), 1);
		assert_eq!(h.logins(), 0);
	}

	#[tokio::test]
	async fn failed_request_recovers_with_one_login() {
		let h = Harness::new(
			FakePortal::validating(true)
				.respond(Err(RequestError::Rejected { status: 401 }))
				.respond(Ok(json!({"data": {}}))),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "renewed")]))]),
		);
		h.store.save(&tokens(&[("s", "stale")])).unwrap();
		let mut manager = h.manager();

		manager.fetch_authenticated(&PortalRequest::energy_flow("NE=1")).await.unwrap();

		assert_eq!(h.logins(), 1);
		assert_eq!(h.requests(), 2);
		// Stale tokens are not revalidated during recovery.
		assert_eq!(*h.portal.headers.lock(), ["s=stale", "s=stale", "s=renewed"]);
		assert_eq!(h.store.load().cookie_header(), "s=renewed");
	}

	#[tokio::test]
	async fn second_failure_surfaces_without_third_login() {
		let h = Harness::new(
			FakePortal::validating(true)
				.respond(Err(RequestError::ErrorPayload("session expired".to_string())))
				.respond(Err(RequestError::Rejected { status: 500 })),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "a")])), Ok(tokens(&[("s", "b")]))]),
		);
		let mut manager = h.manager();

		let err = manager.fetch_authenticated(&PortalRequest::energy_flow("NE=1")).await.unwrap_err();

		assert!(matches!(err, Error::Request(RequestError::Rejected { status: 500 })));
		// One login to establish, one for recovery, none after.
		assert_eq!(h.logins(), 2);
		assert_eq!(h.requests(), 2);
	}

	#[tokio::test]
	async fn persist_failure_is_not_fatal() {
		let temp = TempDir::new().unwrap();
		let blocker = temp.path().join("not-a-dir");
		std::fs::write(&blocker, "").unwrap();
		let portal = Arc::new(FakePortal::validating(true));
		let auth = Arc::new(FakeAuthenticator::yielding(vec![
			Ok(tokens(&[("s", "fresh")])),
			Ok(tokens(&[("s", "again")])),
		]));
		let mut manager = SessionManager::new(
			Credentials::new("user", "secret"),
			"NE=1",
			SessionStore::new(blocker.join("cookies.json")),
			Arc::clone(&portal),
			Arc::clone(&auth),
		);

		manager.ensure_session().await.unwrap();
		assert_eq!(manager.current().cookie_header(), "s=fresh");

		// Store still loads empty, so the next call logs in again.
		manager.ensure_session().await.unwrap();
		assert_eq!(auth.logins.load(Ordering::SeqCst), 2);
		assert_eq!(portal.validations.load(Ordering::SeqCst), 2);
		assert_eq!(manager.current().cookie_header(), "s=again");
	}

	#[tokio::test]
	async fn cleared_store_forces_login_despite_held_session() {
		let h = Harness::new(
			FakePortal::validating(true),
			FakeAuthenticator::yielding(vec![Ok(tokens(&[("s", "first")])), Ok(tokens(&[("s", "second")]))]),
		);
		let mut manager = h.manager();

		manager.ensure_session().await.unwrap();
		assert!(h.store.clear().unwrap());
		manager.ensure_session().await.unwrap();

		assert_eq!(h.logins(), 2);
		// Only the post-login validations; the held "first" tokens are never re-probed.
		assert_eq!(*h.portal.headers.lock(), ["s=first", "s=second"]);
		assert_eq!(h.store.load().cookie_header(), "s=second");
	}

	#[tokio::test]
	async fn energy_flow_decodes_into_typed_response() {
		let h = Harness::new(
			FakePortal::validating(true).respond(Ok(json!({
				"data": {"flow": {"nodes": [{"name": "neteco.pvms.KPI.kpiView.electricalLoad", "value": 1.5}], "links": []}}
			}))),
			FakeAuthenticator::default(),
		);
		h.store.save(&tokens(&[("s", "stored")])).unwrap();
		let mut manager = h.manager();

		let response = manager.fetch_energy_flow().await.unwrap();

		let flow = response.flow().unwrap();
		assert_eq!(flow.nodes.len(), 1);
		assert_eq!(manager.station_dn(), "NE=1");
	}
}
