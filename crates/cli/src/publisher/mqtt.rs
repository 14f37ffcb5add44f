//! Home Assistant MQTT publisher.
//!
//! Discovery configs are retained and re-sent on every broker (re)connect so a
//! restarted broker or Home Assistant relearns the sensors.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use serde_json::json;
use solarbridge::{EnergyMetrics, GridDirection};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::MetricsPublisher;
use crate::error::{CliError, Result};

const TOPIC_PREFIX: &str = "homeassistant/sensor/fusionsolar";
const DEVICE_ID: &str = "fusionsolar_bridge";
const REQUEST_CAPACITY: usize = 64;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct Sensor {
	id: &'static str,
	name: &'static str,
	unit: Option<&'static str>,
	device_class: Option<&'static str>,
	icon: &'static str,
}

const SENSORS: [Sensor; 7] = [
	Sensor {
		id: "electrical_load",
		name: "Solar Electrical Load",
		unit: Some("kW"),
		device_class: Some("power"),
		icon: "mdi:home-lightning-bolt",
	},
	Sensor {
		id: "solar_production",
		name: "Solar Production",
		unit: Some("kW"),
		device_class: Some("power"),
		icon: "mdi:solar-power",
	},
	Sensor {
		id: "grid_import",
		name: "Grid Import",
		unit: Some("kW"),
		device_class: Some("power"),
		icon: "mdi:transmission-tower",
	},
	Sensor {
		id: "battery_power",
		name: "Battery Power",
		unit: Some("kW"),
		device_class: Some("power"),
		icon: "mdi:battery",
	},
	Sensor {
		id: "battery_soc",
		name: "Battery State of Charge",
		unit: Some("%"),
		device_class: Some("battery"),
		icon: "mdi:battery-50",
	},
	Sensor {
		id: "battery_mode",
		name: "Battery Mode",
		unit: None,
		device_class: None,
		icon: "mdi:battery-charging",
	},
	Sensor {
		id: "exceeding_power",
		name: "Exceeding Power",
		unit: Some("kW"),
		device_class: Some("power"),
		icon: "mdi:solar-power-variant",
	},
];

fn state_topic(id: &str) -> String {
	format!("{TOPIC_PREFIX}/{id}/state")
}

/// Retained discovery `(topic, payload)` pairs, one per sensor.
pub fn discovery_messages() -> Vec<(String, String)> {
	let device = json!({
		"identifiers": [DEVICE_ID],
		"name": "FusionSolar System",
		"model": "Huawei FusionSolar",
		"manufacturer": "Huawei",
	});

	SENSORS
		.iter()
		.map(|sensor| {
			let mut config = json!({
				"name": sensor.name,
				"unique_id": format!("fusionsolar_{}", sensor.id),
				"state_topic": state_topic(sensor.id),
				"icon": sensor.icon,
				"device": device.clone(),
			});
			if let Some(unit) = sensor.unit {
				config["unit_of_measurement"] = json!(unit);
				config["state_class"] = json!("measurement");
			}
			if let Some(class) = sensor.device_class {
				config["device_class"] = json!(class);
			}
			(format!("{TOPIC_PREFIX}/{}/config", sensor.id), config.to_string())
		})
		.collect()
}

/// State `(topic, payload)` pairs for the readings present in `metrics`.
///
/// Grid power is signed: positive while importing, negative while exporting.
pub fn state_messages(metrics: &EnergyMetrics) -> Vec<(String, String)> {
	let mut out = Vec::new();
	let mut push = |id: &str, value: String| out.push((state_topic(id), value));

	if let Some(load) = &metrics.electrical_load {
		push("electrical_load", load.kw.to_string());
	}
	if let Some(solar) = &metrics.solar_production {
		push("solar_production", solar.kw.to_string());
	}
	if let Some(grid) = &metrics.grid {
		let signed = match grid.direction {
			GridDirection::Import => grid.power.kw,
			GridDirection::Export => -grid.power.kw,
		};
		push("grid_import", signed.to_string());
	}
	if let Some(battery) = &metrics.battery {
		push("battery_power", battery.power.kw.to_string());
		if let Some(soc) = battery.soc {
			push("battery_soc", soc.to_string());
		}
		if let Some(mode) = &battery.mode {
			push("battery_mode", mode.clone());
		}
	}
	if let Some(surplus) = &metrics.exceeding_power {
		push("exceeding_power", surplus.kw.to_string());
	}
	out
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	pub client_id: String,
	pub keep_alive: Duration,
	pub connect_timeout: Duration,
	pub reconnect_delay: Duration,
}

impl MqttConfig {
	pub fn new(host: impl Into<String>, port: u16) -> Self {
		Self {
			host: host.into(),
			port,
			username: None,
			password: None,
			client_id: format!("solarbridge-{}", std::process::id()),
			keep_alive: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(30),
			reconnect_delay: Duration::from_secs(5),
		}
	}

	pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
		self.username = username;
		self.password = password;
		self
	}

	fn options(&self) -> MqttOptions {
		let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
		options.set_keep_alive(self.keep_alive);
		if let Some(username) = &self.username {
			options.set_credentials(username, self.password.as_deref().unwrap_or_default());
		}
		options
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Link {
	Connecting,
	Up,
	Down(String),
}

/// Publishes to a broker; reconnection is handled by a background event loop task.
pub struct MqttPublisher {
	client: AsyncClient,
	link: watch::Receiver<Link>,
	driver: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPublisher {
	/// Connects and waits for the first acknowledgement.
	pub async fn connect(config: &MqttConfig) -> Result<Self> {
		info!(target = "solarbridge.mqtt", host = %config.host, port = config.port, "connecting to MQTT broker");
		let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
		let (link_tx, mut link) = watch::channel(Link::Connecting);
		let driver = tokio::spawn(drive(eventloop, client.clone(), link_tx, config.reconnect_delay));

		let settled = tokio::time::timeout(config.connect_timeout, link.wait_for(|state| *state != Link::Connecting))
			.await
			.ok()
			.and_then(|changed| changed.ok().map(|state| (*state).clone()));

		match settled {
			Some(Link::Up) => Ok(Self {
				client,
				link,
				driver: Mutex::new(Some(driver)),
			}),
			Some(Link::Down(reason)) => {
				driver.abort();
				Err(CliError::Mqtt(format!("cannot reach {}:{}: {reason}", config.host, config.port)))
			}
			_ => {
				driver.abort();
				Err(CliError::Mqtt(format!(
					"no answer from {}:{} within {:?}",
					config.host, config.port, config.connect_timeout
				)))
			}
		}
	}

	pub fn is_connected(&self) -> bool {
		*self.link.borrow() == Link::Up
	}
}

#[async_trait]
impl MetricsPublisher for MqttPublisher {
	fn name(&self) -> &'static str {
		"mqtt"
	}

	async fn publish(&self, metrics: &EnergyMetrics) -> Result<()> {
		if !self.is_connected() {
			warn!(target = "solarbridge.mqtt", "MQTT not connected; skipping publish");
			return Ok(());
		}

		let messages = state_messages(metrics);
		let count = messages.len();
		for (topic, payload) in messages {
			self.client
				.publish(topic, QoS::AtLeastOnce, false, payload)
				.await
				.map_err(|err| CliError::Mqtt(err.to_string()))?;
		}
		debug!(target = "solarbridge.mqtt", count, "published sensor states");
		Ok(())
	}

	async fn shutdown(&self) {
		if let Err(err) = self.client.disconnect().await {
			debug!(target = "solarbridge.mqtt", error = %err, "disconnect request not queued");
		}
		let driver = self.driver.lock().take();
		if let Some(mut driver) = driver {
			if tokio::time::timeout(SHUTDOWN_GRACE, &mut driver).await.is_err() {
				driver.abort();
			}
		}
		info!(target = "solarbridge.mqtt", "disconnected from MQTT broker");
	}
}

async fn drive(mut eventloop: EventLoop, client: AsyncClient, link: watch::Sender<Link>, reconnect_delay: Duration) {
	loop {
		match eventloop.poll().await {
			Ok(Event::Incoming(Packet::ConnAck(_))) => {
				info!(target = "solarbridge.mqtt", "connected to MQTT broker");
				announce(&client);
				link.send_replace(Link::Up);
			}
			Ok(Event::Outgoing(Outgoing::Disconnect)) => {
				link.send_replace(Link::Down("disconnected".to_string()));
				return;
			}
			Ok(_) => {}
			Err(err) => {
				warn!(target = "solarbridge.mqtt", error = %err, retry_in = ?reconnect_delay, "MQTT connection error");
				link.send_replace(Link::Down(err.to_string()));
				tokio::time::sleep(reconnect_delay).await;
			}
		}
	}
}

fn announce(client: &AsyncClient) {
	for (topic, payload) in discovery_messages() {
		if let Err(err) = client.try_publish(topic, QoS::AtLeastOnce, true, payload) {
			warn!(target = "solarbridge.mqtt", error = %err, "discovery message not queued");
		}
	}
	debug!(target = "solarbridge.mqtt", count = SENSORS.len(), "queued discovery messages");
}
