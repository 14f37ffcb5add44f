//! Keeps a long-running poller authenticated against the FusionSolar portal.
//!
//! The portal has no stable public API and only an interactive login form, so
//! the session lifecycle is the interesting part:
//!
//! - [`SessionStore`] persists harvested tokens as a whole-file JSON array
//! - [`Portal`] validates tokens, keeps them alive, and issues data requests
//! - [`Authenticator`] runs the interactive login (a real browser in production)
//! - [`SessionManager`] ties these together behind `ensure_session` and
//!   `fetch_authenticated`, with exactly one re-login per failed request
//!
//! [`metrics::extract_metrics`] shapes the energy-flow payload for publishers.

pub mod error;
pub mod metrics;
pub mod portal;
pub mod session;

pub use error::{AuthError, Error, RequestError, Result};
pub use metrics::{BatteryReading, EnergyMetrics, GridDirection, GridReading, PowerReading, extract_metrics};
pub use portal::{HttpPortal, Portal, PortalConfig, PortalRequest};
pub use session::{Authenticator, BrowserAuthenticator, Credentials, LoginForm, SessionManager, SessionState, SessionStore};
pub use solarbridge_protocol::{EnergyFlowResponse, SameSite, SessionToken};
