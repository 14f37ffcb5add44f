//! Sinks for extracted metrics.

mod console;
mod mqtt;

use async_trait::async_trait;
use solarbridge::EnergyMetrics;

pub use console::ConsolePublisher;
pub use mqtt::{MqttConfig, MqttPublisher, discovery_messages, state_messages};

use crate::error::Result;

/// Receives every snapshot's metrics; must accept partial sets.
#[async_trait]
pub trait MetricsPublisher: Send + Sync {
	fn name(&self) -> &'static str;

	async fn publish(&self, metrics: &EnergyMetrics) -> Result<()>;

	async fn shutdown(&self) {}
}
