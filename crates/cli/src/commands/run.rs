use std::time::Duration;

use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::context::AppContext;
use crate::error::Result;
use crate::poll::{self, PollOptions};
use crate::publisher::{ConsolePublisher, MetricsPublisher, MqttConfig, MqttPublisher};

pub async fn execute(ctx: &AppContext, args: &RunArgs) -> Result<()> {
	let mut manager = ctx.session_manager()?;
	let publishers = publishers(args).await;

	let options = PollOptions {
		interval: Duration::from_secs(args.interval_minutes * 60),
		dump: args.dump,
	};
	info!(
		target = "solarbridge",
		station = manager.station_dn(),
		interval_minutes = args.interval_minutes,
		publishers = ?publishers.iter().map(|p| p.name()).collect::<Vec<_>>(),
		"starting bridge"
	);

	poll::run_loop(&mut manager, &publishers, &options, poll::shutdown_signal()).await;
	info!(target = "solarbridge", "stopped");
	Ok(())
}

async fn publishers(args: &RunArgs) -> Vec<Box<dyn MetricsPublisher>> {
	let mut publishers: Vec<Box<dyn MetricsPublisher>> = vec![Box::new(ConsolePublisher)];

	let Some(host) = &args.mqtt_host else {
		info!(target = "solarbridge.mqtt", "MQTT_HOST not set; MQTT publishing disabled");
		return publishers;
	};

	let config = MqttConfig::new(host.clone(), args.mqtt_port).with_credentials(args.mqtt_username.clone(), args.mqtt_password.clone());
	match MqttPublisher::connect(&config).await {
		Ok(mqtt) => publishers.push(Box::new(mqtt)),
		Err(err) => warn!(target = "solarbridge.mqtt", error = %err, "continuing without MQTT"),
	}
	publishers
}
