//! Chromium lifecycle and DevTools plumbing for interactive portal logins.
//!
//! The runtime owns everything that touches a real browser:
//!
//! - [`browser_finder`] locates a Chrome/Chromium executable
//! - [`BrowserProcess`] launches it with remote debugging and tears it down on every exit path
//! - [`cdp_probe`] talks to the `/json/*` HTTP endpoints
//! - [`CdpConnection`] correlates DevTools requests and responses over a websocket
//! - [`Page`] exposes the page operations a form login needs

pub mod browser_finder;
pub mod cdp_probe;
pub mod connection;
pub mod error;
pub mod launcher;
pub mod page;
pub mod process;

pub use connection::CdpConnection;
pub use error::{Result, RuntimeError};
pub use launcher::{BrowserProcess, LaunchOptions};
pub use page::{LoadWaiter, Page};
