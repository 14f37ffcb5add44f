//! Local port helpers for browser debugging endpoints.

use std::net::TcpListener;

use crate::error::{Result, RuntimeError};

/// Asks the OS for an unused localhost port.
///
/// The port is released before returning, so another process may grab it; the
/// launcher treats a failed endpoint probe as a launch failure.
pub fn free_port() -> Result<u16> {
	let listener = TcpListener::bind(("127.0.0.1", 0)).map_err(RuntimeError::NoFreePort)?;
	let port = listener.local_addr().map_err(RuntimeError::NoFreePort)?.port();
	Ok(port)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn free_port_is_released_and_bindable() {
		let port = free_port().unwrap();
		assert_ne!(port, 0);
		assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
	}
}
