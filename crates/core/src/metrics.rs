//! Shapes the energy-flow graph into the handful of readings publishers need.
//!
//! Missing nodes or links mean the metric is absent, never an error.

use solarbridge_protocol::{EnergyFlowResponse, Flow, FlowNode, leading_number, numeric};

const LOAD_NODE: &str = "neteco.pvms.KPI.kpiView.electricalLoad";
const STRING_NODE: &str = "neteco.pvms.devTypeLangKey.string";
const STRING_MOC_ID: i64 = 20812;
const BATTERY_NODE: &str = "neteco.pvms.devTypeLangKey.energy_store";
const INPUT_POWER_LINK: &str = "neteco.pvms.energy.flow.input.power";
const GRID_LINK: &str = "neteco.pvms.energy.flow.buy.power";

/// A power value as the portal displays it plus its numeric kW.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerReading {
	pub display: String,
	pub kw: f64,
}

impl PowerReading {
	fn from_parts(display: Option<String>, kw: Option<f64>) -> Option<Self> {
		let kw = kw.or_else(|| display.as_deref().and_then(leading_number))?;
		let display = display.unwrap_or_else(|| format_kw(kw));
		Some(Self { display, kw })
	}

	fn from_node(node: &FlowNode) -> Option<Self> {
		Self::from_parts(node.display_value(), node.numeric_value())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridDirection {
	Import,
	Export,
}

impl GridDirection {
	pub fn label(self) -> &'static str {
		match self {
			GridDirection::Import => "Grid Import",
			GridDirection::Export => "Grid Export",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridReading {
	pub direction: GridDirection,
	pub power: PowerReading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryReading {
	/// Positive while charging, negative while discharging.
	pub power: PowerReading,
	/// State of charge in percent.
	pub soc: Option<f64>,
	pub mode: Option<String>,
}

impl BatteryReading {
	pub fn is_charging(&self) -> bool {
		self.power.kw > 0.0
	}
}

/// Readings extracted from one energy-flow snapshot; any subset may be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyMetrics {
	pub electrical_load: Option<PowerReading>,
	pub solar_production: Option<PowerReading>,
	pub grid: Option<GridReading>,
	pub battery: Option<BatteryReading>,
	/// Solar surplus over household load, never negative.
	pub exceeding_power: Option<PowerReading>,
}

impl EnergyMetrics {
	pub fn is_empty(&self) -> bool {
		self.electrical_load.is_none()
			&& self.solar_production.is_none()
			&& self.grid.is_none()
			&& self.battery.is_none()
			&& self.exceeding_power.is_none()
	}
}

/// Returns `None` when the response carries no flow graph.
pub fn extract_metrics(response: &EnergyFlowResponse) -> Option<EnergyMetrics> {
	let flow = response.flow()?;

	let electrical_load = flow.node(LOAD_NODE).and_then(PowerReading::from_node);
	let solar_production = solar(flow);
	let exceeding_power = match (&solar_production, &electrical_load) {
		(Some(solar), Some(load)) => {
			let surplus = (solar.kw - load.kw).max(0.0);
			Some(PowerReading {
				display: format_kw(surplus),
				kw: surplus,
			})
		}
		_ => None,
	};

	Some(EnergyMetrics {
		electrical_load,
		solar_production,
		grid: grid(flow),
		battery: battery(flow),
		exceeding_power,
	})
}

fn solar(flow: &Flow) -> Option<PowerReading> {
	let node = flow
		.nodes
		.iter()
		.find(|node| node.name.as_deref() == Some(STRING_NODE) && node.moc_id() == Some(STRING_MOC_ID));
	if let Some(reading) = node.and_then(PowerReading::from_node) {
		return Some(reading);
	}
	let link = flow.link(INPUT_POWER_LINK)?;
	PowerReading::from_parts(link.display_value(), None)
}

fn grid(flow: &Flow) -> Option<GridReading> {
	let link = flow.link(GRID_LINK)?;
	let power = PowerReading::from_parts(link.display_value(), None)?;
	let direction = if link.is_forward() {
		GridDirection::Export
	} else {
		GridDirection::Import
	};
	Some(GridReading { direction, power })
}

fn battery(flow: &Flow) -> Option<BatteryReading> {
	let node = flow.node(BATTERY_NODE)?;
	node.device_tips.as_ref()?;

	let power = PowerReading::from_parts(node.display_value(), Some(node.numeric_value().unwrap_or(0.0)))?;
	let soc = node.tip("SOC").and_then(numeric);
	let mode = node.tip("CHARGE_MODE_VALUE").and_then(|value| match value {
		serde_json::Value::String(text) => Some(text.clone()),
		serde_json::Value::Null => None,
		other => Some(other.to_string()),
	});
	Some(BatteryReading { power, soc, mode })
}

fn format_kw(kw: f64) -> String {
	format!("{kw:.3} kW")
}
