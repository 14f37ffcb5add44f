//! Chromium executable discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, RuntimeError};

/// Resolves the browser to launch.
///
/// An explicit path wins when it exists or resolves on `PATH`; otherwise the
/// platform's usual install locations and command names are tried in order.
pub fn find_chromium(explicit: Option<&Path>) -> Result<PathBuf> {
	if let Some(path) = explicit {
		return resolve_candidate(&path.to_string_lossy()).ok_or(RuntimeError::ExecutableNotFound);
	}

	for candidate in platform_candidates() {
		if let Some(found) = resolve_candidate(&candidate) {
			debug!(target = "solarbridge.browser", path = %found.display(), "found browser executable");
			return Ok(found);
		}
	}

	Err(RuntimeError::ExecutableNotFound)
}

fn resolve_candidate(candidate: &str) -> Option<PathBuf> {
	if is_path_like(candidate) {
		let path = Path::new(candidate);
		path.exists().then(|| path.to_path_buf())
	} else {
		which::which(candidate).ok()
	}
}

fn is_path_like(candidate: &str) -> bool {
	candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':')
}

fn platform_candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		[
			"chromium",
			"chromium-browser",
			"google-chrome-stable",
			"google-chrome",
			"/usr/bin/chromium",
			"/usr/bin/chromium-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	}
}

fn windows_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(|key| std::env::var(key).ok())
		.map(PathBuf::from)
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Chromium", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
	];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| {
			suffixes
				.iter()
				.map(move |suffix| suffix.iter().fold(root.clone(), |path, part| path.join(part)))
		})
		.map(|path| path.to_string_lossy().to_string())
		.collect();

	candidates.extend(["chrome.exe", "msedge.exe", "chromium.exe"].map(str::to_string));
	candidates
}

#[cfg(test)]
mod tests {
	use tempfile::NamedTempFile;

	use super::*;

	#[test]
	fn windows_candidates_include_common_commands() {
		let candidates = windows_candidates();
		assert!(candidates.contains(&"chrome.exe".to_string()));
		assert!(candidates.contains(&"msedge.exe".to_string()));
		assert!(candidates.iter().any(|c| c.ends_with("chrome.exe") && c.contains("Google")));
	}

	#[test]
	fn explicit_existing_path_is_used() {
		let file = NamedTempFile::new().unwrap();
		let found = find_chromium(Some(file.path())).unwrap();
		assert_eq!(found, file.path());
	}

	#[test]
	fn explicit_missing_path_is_not_found() {
		let err = find_chromium(Some(Path::new("/definitely/missing/chrome"))).unwrap_err();
		assert!(matches!(err, RuntimeError::ExecutableNotFound));
	}
}
