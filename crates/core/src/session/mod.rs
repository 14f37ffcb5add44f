//! Session lifecycle: state, persistence, interactive login, orchestration.

/// Interactive login boundary and its browser-backed implementation.
pub mod authenticator;
/// Orchestration of load, validate, login, and request recovery.
pub mod manager;
/// Session token set and login credentials.
pub mod state;
/// Whole-file persistence of the session token set.
pub mod store;

pub use authenticator::{Authenticator, BrowserAuthenticator, LoginForm};
pub use manager::SessionManager;
pub use state::{Credentials, SessionState};
pub use store::SessionStore;
