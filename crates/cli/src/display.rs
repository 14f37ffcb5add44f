//! Human-readable rendering for the terminal.

use std::fmt::Write;

use solarbridge::{EnergyMetrics, SessionState};

const RULE: &str = "----------------------------------------";

pub fn render_metrics(metrics: &EnergyMetrics) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "{RULE}");
	let _ = writeln!(out, "SOLAR SYSTEM METRICS");
	let _ = writeln!(out, "{RULE}");

	if let Some(load) = &metrics.electrical_load {
		let _ = writeln!(out, "Electrical Load (Household): {}", load.display);
	}
	if let Some(solar) = &metrics.solar_production {
		let _ = writeln!(out, "Solar Production: {}", solar.display);
	}
	if let Some(grid) = &metrics.grid {
		let _ = writeln!(out, "{}: {}", grid.direction.label(), grid.power.display);
	}
	if let Some(battery) = &metrics.battery {
		let soc = battery.soc.map(|soc| format!("{soc}%")).unwrap_or_else(|| "-".to_string());
		let state = if battery.is_charging() { "charging" } else { "idle/discharging" };
		let _ = writeln!(out, "Battery: {} (SOC: {soc}, {state})", battery.power.display);
		if let Some(mode) = &battery.mode {
			let _ = writeln!(out, "  Mode: {mode}");
		}
	}
	if let Some(surplus) = &metrics.exceeding_power {
		let status = if surplus.kw > 0.0 { "Surplus" } else { "Balanced" };
		let _ = writeln!(out, "Exceeding Power: {} ({status})", surplus.display);
	}
	if metrics.is_empty() {
		let _ = writeln!(out, "(no readings in snapshot)");
	}

	let _ = write!(out, "{RULE}");
	out
}

/// Token table for `show`: names, domains, and expiry only.
pub fn render_session(source: &str, state: &SessionState, now: f64) -> String {
	let mut out = String::new();
	let _ = writeln!(out, "Session state from: {source}");
	let _ = writeln!(out);
	let _ = writeln!(out, "COOKIES ({}):", state.len());
	if state.is_empty() {
		let _ = write!(out, "  (none)");
		return out;
	}

	let _ = writeln!(out, "  {:<24} {:<36} {:<10}", "NAME", "DOMAIN", "EXPIRES");
	let _ = writeln!(out, "  {}", "-".repeat(72));
	for token in state.tokens() {
		let domain = if token.domain.is_empty() { "-" } else { token.domain.as_str() };
		let _ = writeln!(out, "  {:<24} {:<36} {:<10}", token.name, domain, format_expiry(token.expires_at, now));
	}
	let expired = state.tokens().iter().filter(|t| t.is_expired(now)).count();
	if expired > 0 {
		let _ = write!(out, "  {expired} of {} cookies expired", state.len());
	}
	out.trim_end().to_string()
}

pub fn format_expiry(expires: Option<f64>, now: f64) -> String {
	let ts = match expires {
		None => return "session".into(),
		Some(ts) if ts < 0.0 => return "session".into(),
		Some(ts) => ts as i64,
	};
	let now = now as i64;

	if ts < now {
		return "expired".into();
	}

	match ts - now {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> f64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
	use solarbridge::{BatteryReading, GridDirection, GridReading, PowerReading, SessionToken};

	use super::*;

	fn kw(display: &str, kw: f64) -> PowerReading {
		PowerReading {
			display: display.to_string(),
			kw,
		}
	}

	#[test]
	fn expiry_buckets() {
		let now = 1_000_000.0;
		assert_eq!(format_expiry(None, now), "session");
		assert_eq!(format_expiry(Some(-1.0), now), "session");
		assert_eq!(format_expiry(Some(now - 1.0), now), "expired");
		assert_eq!(format_expiry(Some(now + 600.0), now), "10m");
		assert_eq!(format_expiry(Some(now + 7200.0), now), "2h");
		assert_eq!(format_expiry(Some(now + 3.0 * 86400.0), now), "3d");
	}

	#[test]
	fn metrics_block_lists_present_readings_only() {
		let metrics = EnergyMetrics {
			electrical_load: Some(kw("0.800 kW", 0.8)),
			grid: Some(GridReading {
				direction: GridDirection::Export,
				power: kw("1.200 kW", 1.2),
			}),
			battery: Some(BatteryReading {
				power: kw("0.300 kW", 0.3),
				soc: Some(55.0),
				mode: Some("TOU".to_string()),
			}),
			..EnergyMetrics::default()
		};

		let rendered = render_metrics(&metrics);
		assert!(rendered.contains("Electrical Load (Household): 0.800 kW"));
		assert!(rendered.contains("Grid Export: 1.200 kW"));
		assert!(rendered.contains("Battery: 0.300 kW (SOC: 55%, charging)"));
		assert!(rendered.contains("Mode: TOU"));
		assert!(!rendered.contains("Solar Production"));
		assert!(!rendered.contains("Exceeding Power"));
	}

	#[test]
	fn session_table_never_shows_values() {
		let mut token = SessionToken::new("JSESSIONID", "top-secret");
		token.domain = "eu5.example.com".to_string();
		let state = SessionState::new(vec![token]);

		let rendered = render_session("cookies.json", &state, 0.0);
		assert!(rendered.contains("JSESSIONID"));
		assert!(rendered.contains("eu5.example.com"));
		assert!(!rendered.contains("top-secret"));

		assert!(render_session("cookies.json", &SessionState::empty(), 0.0).contains("(none)"));
	}

	#[test]
	fn session_cookies_are_not_counted_as_expired() {
		let mut session_cookie = SessionToken::new("JSESSIONID", "v");
		session_cookie.expires_at = Some(-1.0);
		let mut stale = SessionToken::new("old", "v");
		stale.expires_at = Some(10.0);
		let state = SessionState::new(vec![session_cookie, stale]);

		let rendered = render_session("cookies.json", &state, 1_000.0);
		assert!(rendered.contains("session"));
		assert!(rendered.contains("1 of 2 cookies expired"));
	}
}
