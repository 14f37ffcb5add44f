use async_trait::async_trait;
use solarbridge::EnergyMetrics;

use super::MetricsPublisher;
use crate::display::render_metrics;
use crate::error::Result;

/// Prints the metric block to stdout.
#[derive(Debug, Default)]
pub struct ConsolePublisher;

#[async_trait]
impl MetricsPublisher for ConsolePublisher {
	fn name(&self) -> &'static str {
		"console"
	}

	async fn publish(&self, metrics: &EnergyMetrics) -> Result<()> {
		println!("{}", render_metrics(metrics));
		Ok(())
	}
}
