//! The long-running poll loop.
//!
//! One cycle runs immediately, then one per interval. Ticks missed during a slow
//! cycle (typically an interactive login) are delayed, so cycles never overlap.
//! A failed cycle is logged and the loop keeps going.

use std::future::Future;
use std::time::Duration;

use solarbridge::{Authenticator, EnergyMetrics, Portal, SessionManager, extract_metrics};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::{CliError, Result};
use crate::publisher::MetricsPublisher;

#[derive(Debug, Clone)]
pub struct PollOptions {
	pub interval: Duration,
	/// Log the full payload every cycle.
	pub dump: bool,
}

/// Fetches one snapshot and hands its metrics to every publisher.
///
/// Returns `None` when the snapshot carried no flow graph.
pub async fn run_cycle<P: Portal, A: Authenticator>(
	manager: &mut SessionManager<P, A>,
	publishers: &[Box<dyn MetricsPublisher>],
	dump: bool,
) -> Result<Option<EnergyMetrics>> {
	let response = manager.fetch_energy_flow().await?;

	if dump {
		info!(target = "solarbridge", payload = %serde_json::to_string(&response)?, "full energy-flow payload");
	}

	let Some(metrics) = extract_metrics(&response) else {
		warn!(target = "solarbridge", "energy-flow response carried no flow data");
		return Ok(None);
	};

	for publisher in publishers {
		if let Err(err) = publisher.publish(&metrics).await {
			warn!(target = "solarbridge", publisher = publisher.name(), error = %err, "publish failed");
		}
	}
	Ok(Some(metrics))
}

/// Polls until `shutdown` resolves, then shuts every publisher down.
///
/// Returns the number of cycles started.
pub async fn run_loop<P, A, S>(
	manager: &mut SessionManager<P, A>,
	publishers: &[Box<dyn MetricsPublisher>],
	options: &PollOptions,
	shutdown: S,
) -> u64
where
	P: Portal,
	A: Authenticator,
	S: Future<Output = ()>,
{
	let mut ticker = tokio::time::interval(options.interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	tokio::pin!(shutdown);

	let mut cycles = 0u64;
	info!(target = "solarbridge", interval = ?options.interval, "polling started");

	loop {
		tokio::select! {
			_ = &mut shutdown => {
				info!(target = "solarbridge", cycles, "shutdown requested");
				break;
			}
			_ = async {
				ticker.tick().await;
				cycles += 1;
				match run_cycle(manager, publishers, options.dump).await {
					Ok(Some(_)) => debug!(target = "solarbridge", cycle = cycles, "cycle complete"),
					Ok(None) => {}
					Err(err) => report(cycles, &err),
				}
			} => {}
		}
	}

	for publisher in publishers {
		publisher.shutdown().await;
	}
	cycles
}

fn report(cycle: u64, err: &CliError) {
	error!(target = "solarbridge", cycle, phase = err.phase(), error = %err, "poll cycle failed; will retry next interval");
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			warn!(target = "solarbridge", error = %err, "cannot listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(err) => {
				warn!(target = "solarbridge", error = %err, "cannot listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use parking_lot::Mutex;
	use serde_json::{Value, json};
	use solarbridge::{AuthError, Credentials, PortalRequest, RequestError, SessionState, SessionStore, SessionToken};
	use tempfile::TempDir;

	use super::*;

	/// Portal that always validates and answers requests from a script.
	struct ScriptedPortal {
		responses: Mutex<VecDeque<std::result::Result<Value, RequestError>>>,
	}

	#[async_trait]
	impl Portal for ScriptedPortal {
		async fn validate(&self, state: &SessionState) -> bool {
			!state.is_empty()
		}

		async fn keep_alive(&self, _state: &SessionState) -> bool {
			true
		}

		async fn get_json(&self, _request: &PortalRequest, _state: &SessionState) -> std::result::Result<Value, RequestError> {
			self.responses
				.lock()
				.pop_front()
				.unwrap_or_else(|| Ok(json!({"data": {"flow": {"nodes": [], "links": []}}})))
		}
	}

	struct StaticLogin;

	#[async_trait]
	impl Authenticator for StaticLogin {
		async fn login(&self, _credentials: &Credentials) -> std::result::Result<SessionState, AuthError> {
			Ok(SessionState::new(vec![SessionToken::new("s", "v")]))
		}
	}

	#[derive(Default)]
	struct Recorder {
		published: Arc<Mutex<Vec<EnergyMetrics>>>,
		shutdowns: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl MetricsPublisher for Recorder {
		fn name(&self) -> &'static str {
			"recorder"
		}

		async fn publish(&self, metrics: &EnergyMetrics) -> Result<()> {
			self.published.lock().push(metrics.clone());
			Ok(())
		}

		async fn shutdown(&self) {
			self.shutdowns.fetch_add(1, Ordering::SeqCst);
		}
	}

	fn manager(temp: &TempDir, responses: Vec<std::result::Result<Value, RequestError>>) -> SessionManager<ScriptedPortal, StaticLogin> {
		SessionManager::new(
			Credentials::new("u", "p"),
			"NE=1",
			SessionStore::new(temp.path().join("cookies.json")),
			ScriptedPortal {
				responses: Mutex::new(responses.into()),
			},
			StaticLogin,
		)
	}

	#[tokio::test]
	async fn cycle_publishes_extracted_metrics() {
		let temp = TempDir::new().unwrap();
		let mut manager = manager(
			&temp,
			vec![Ok(json!({"data": {"flow": {"nodes": [
				{"name": "neteco.pvms.KPI.kpiView.electricalLoad", "value": 0.6, "description": {"value": "0.600 kW"}}
			]}}}))],
		);
		let recorder = Recorder::default();
		let published = Arc::clone(&recorder.published);
		let publishers: Vec<Box<dyn MetricsPublisher>> = vec![Box::new(recorder)];

		let metrics = run_cycle(&mut manager, &publishers, true).await.unwrap().unwrap();

		assert_eq!(metrics.electrical_load.unwrap().kw, 0.6);
		assert_eq!(published.lock().len(), 1);
	}

	#[tokio::test]
	async fn cycle_without_flow_publishes_nothing() {
		let temp = TempDir::new().unwrap();
		let mut manager = manager(&temp, vec![Ok(json!({"data": {}}))]);
		let recorder = Recorder::default();
		let published = Arc::clone(&recorder.published);
		let publishers: Vec<Box<dyn MetricsPublisher>> = vec![Box::new(recorder)];

		assert!(run_cycle(&mut manager, &publishers, false).await.unwrap().is_none());
		assert!(published.lock().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn failing_cycles_do_not_stop_the_loop() {
		let temp = TempDir::new().unwrap();
		let failures = (0..4).map(|_| Err(RequestError::Rejected { status: 500 })).collect();
		let mut manager = manager(&temp, failures);
		let recorder = Recorder::default();
		let published = Arc::clone(&recorder.published);
		let shutdowns = Arc::clone(&recorder.shutdowns);
		let publishers: Vec<Box<dyn MetricsPublisher>> = vec![Box::new(recorder)];
		let options = PollOptions {
			interval: Duration::from_secs(60),
			dump: false,
		};

		let cycles = run_loop(&mut manager, &publishers, &options, tokio::time::sleep(Duration::from_secs(150))).await;

		// Cycles at t=0, 60, 120; the first two each burn two scripted failures.
		assert_eq!(cycles, 3);
		assert_eq!(published.lock().len(), 1);
		assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
	}
}
