//! Wire types for solarbridge.
//!
//! This crate contains the serde-serializable shapes exchanged with the outside
//! world: the persisted session file, the portal's energy-flow payload, and the
//! subset of the Chrome DevTools Protocol used to drive the interactive login.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and small pure helpers
//! * Lenient: Upstream payloads have no published schema, so absent fields deserialize to `None`
//! * Stable: Changes only when a wire format changes
//!
//! Session orchestration is built on top of these types in `solarbridge-core`.

pub mod cdp;
pub mod cookie;
pub mod energy_flow;
pub mod portal;

pub use cdp::*;
pub use cookie::*;
pub use energy_flow::*;
pub use portal::*;
