//! Persisted session store.
//!
//! The file holds a JSON array of [`SessionToken`]s. Saves write a sibling temp
//! file and rename it over the target, so readers observe either the previous
//! or the new token set in full.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use solarbridge_protocol::SessionToken;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::state::SessionState;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct SessionStore {
	path: PathBuf,
}

impl SessionStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the stored token set; a missing or unreadable file is an empty session.
	pub fn load(&self) -> SessionState {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				debug!(target = "solarbridge.session", phase = "load", path = %self.path.display(), "no session file");
				return SessionState::empty();
			}
			Err(err) => {
				warn!(target = "solarbridge.session", phase = "load", path = %self.path.display(), error = %err, "session file unreadable; treating as empty");
				return SessionState::empty();
			}
		};

		match serde_json::from_str::<Vec<SessionToken>>(&content) {
			Ok(tokens) => {
				debug!(target = "solarbridge.session", phase = "load", count = tokens.len(), "loaded session tokens");
				SessionState::new(tokens)
			}
			Err(err) => {
				warn!(target = "solarbridge.session", phase = "load", path = %self.path.display(), error = %err, "session file malformed; treating as empty");
				SessionState::empty()
			}
		}
	}

	/// Replaces the stored token set atomically.
	pub fn save(&self, state: &SessionState) -> Result<()> {
		self.write_atomic(state).map_err(|source| Error::Storage {
			path: self.path.clone(),
			source,
		})?;
		debug!(target = "solarbridge.session", phase = "store", count = state.len(), path = %self.path.display(), "saved session tokens");
		Ok(())
	}

	/// Removes the stored session; returns whether a file existed.
	pub fn clear(&self) -> Result<bool> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(source) => Err(Error::Storage {
				path: self.path.clone(),
				source,
			}),
		}
	}

	fn write_atomic(&self, state: &SessionState) -> io::Result<()> {
		let dir = match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		fs::create_dir_all(dir)?;

		let mut tmp = NamedTempFile::new_in(dir)?;
		serde_json::to_writer_pretty(&mut tmp, state.tokens()).map_err(io::Error::other)?;
		tmp.write_all(b"\n")?;
		tmp.as_file().sync_all()?;
		tmp.persist(&self.path).map_err(|err| err.error)?;
		Ok(())
	}
}
