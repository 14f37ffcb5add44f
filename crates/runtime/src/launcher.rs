//! Browser process launch with guaranteed teardown.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::browser_finder::find_chromium;
use crate::cdp_probe::{fetch_version, page_websocket_url};
use crate::error::{Result, RuntimeError};
use crate::page::Page;
use crate::process::free_port;

const PROBE_INTERVAL: Duration = Duration::from_millis(200);
const EXIT_WAIT: Duration = Duration::from_secs(5);

/// How to start the automation browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit executable; discovered when `None`.
	pub executable: Option<PathBuf>,
	pub headless: bool,
	pub window_size: (u32, u32),
	/// How long to wait for the debugging endpoint after spawn.
	pub startup_timeout: Duration,
	/// Response deadline for each DevTools command on opened pages.
	pub command_timeout: Duration,
	pub extra_args: Vec<String>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			window_size: (1920, 1080),
			startup_timeout: Duration::from_secs(20),
			command_timeout: Duration::from_secs(30),
			extra_args: Vec::new(),
		}
	}
}

impl LaunchOptions {
	fn args(&self, port: u16, profile: &std::path::Path) -> Vec<String> {
		let (width, height) = self.window_size;
		let mut args = vec![
			format!("--remote-debugging-port={port}"),
			format!("--user-data-dir={}", profile.display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--no-sandbox".to_string(),
			"--disable-setuid-sandbox".to_string(),
			"--disable-dev-shm-usage".to_string(),
			"--disable-accelerated-2d-canvas".to_string(),
			"--disable-gpu".to_string(),
			format!("--window-size={width},{height}"),
		];
		if self.headless {
			args.push("--headless=new".to_string());
		}
		args.extend(self.extra_args.iter().cloned());
		args.push("about:blank".to_string());
		args
	}
}

/// A running browser with a throwaway profile.
///
/// The child is spawned with `kill_on_drop`, and the profile directory is a
/// [`TempDir`], so dropping the handle on any path releases both. Prefer
/// [`BrowserProcess::close`] to also reap the process.
pub struct BrowserProcess {
	child: Child,
	port: u16,
	command_timeout: Duration,
	_profile: TempDir,
}

impl BrowserProcess {
	/// Spawns the browser and waits until its debugging endpoint answers.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let executable = find_chromium(options.executable.as_deref())?;
		let profile = tempfile::Builder::new()
			.prefix("solarbridge-profile-")
			.tempdir()
			.map_err(|source| RuntimeError::Launch {
				path: executable.display().to_string(),
				source,
			})?;
		let port = free_port()?;

		let mut cmd = Command::new(&executable);
		cmd.args(options.args(port, profile.path()))
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.kill_on_drop(true);

		let mut child = cmd.spawn().map_err(|source| RuntimeError::Launch {
			path: executable.display().to_string(),
			source,
		})?;
		debug!(target = "solarbridge.browser", path = %executable.display(), port, headless = options.headless, "browser spawned");

		let started = Instant::now();
		let mut last_error = "endpoint not reachable".to_string();
		while started.elapsed() < options.startup_timeout {
			tokio::time::sleep(PROBE_INTERVAL).await;

			if let Ok(Some(status)) = child.try_wait() {
				return Err(RuntimeError::Exited(status.to_string()));
			}

			match fetch_version(port).await {
				Ok(version) => {
					info!(target = "solarbridge.browser", port, browser = ?version.browser, "browser ready");
					return Ok(Self {
						child,
						port,
						command_timeout: options.command_timeout,
						_profile: profile,
					});
				}
				Err(err) => last_error = err.to_string(),
			}
		}

		let _ = child.start_kill();
		Err(RuntimeError::EndpointUnavailable { port, last_error })
	}

	/// Attaches to the browser's first page, opening one if needed.
	pub async fn open_page(&self) -> Result<Page> {
		let url = page_websocket_url(self.port).await?;
		Page::attach(&url, self.command_timeout).await
	}

	/// Kills the browser and waits for it to exit.
	pub async fn close(mut self) {
		if let Err(err) = self.child.start_kill() {
			debug!(target = "solarbridge.browser", error = %err, "browser already gone");
		}
		match tokio::time::timeout(EXIT_WAIT, self.child.wait()).await {
			Ok(Ok(status)) => debug!(target = "solarbridge.browser", %status, "browser exited"),
			Ok(Err(err)) => warn!(target = "solarbridge.browser", error = %err, "failed to reap browser"),
			Err(_) => warn!(target = "solarbridge.browser", "browser did not exit in time"),
		}
	}
}
