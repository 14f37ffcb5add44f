//! Energy-flow snapshot returned by `/rest/pvms/web/station/v3/overview/energy-flow`.
//!
//! The portal publishes no schema for this payload. Every field is optional and
//! numeric values are kept as raw [`Value`]s because the portal mixes numbers and
//! numeric strings between firmware versions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level energy-flow response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnergyFlowResponse {
	#[serde(default)]
	pub data: Option<EnergyFlowData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub success: Option<bool>,
}

impl EnergyFlowResponse {
	/// Returns the flow graph when the response carries one.
	pub fn flow(&self) -> Option<&Flow> {
		self.data.as_ref().and_then(|data| data.flow.as_ref())
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnergyFlowData {
	#[serde(default)]
	pub flow: Option<Flow>,
}

/// Flow graph: devices as nodes, power transfers as links.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flow {
	#[serde(default)]
	pub nodes: Vec<FlowNode>,
	#[serde(default)]
	pub links: Vec<FlowLink>,
}

impl Flow {
	/// Finds the first node with the given `name`.
	pub fn node(&self, name: &str) -> Option<&FlowNode> {
		self.nodes.iter().find(|node| node.name.as_deref() == Some(name))
	}

	/// Finds the first link whose description label equals `label`.
	pub fn link(&self, label: &str) -> Option<&FlowLink> {
		self.links
			.iter()
			.find(|link| link.description.as_ref().and_then(|d| d.label.as_deref()) == Some(label))
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub moc_id: Option<Value>,
	#[serde(default)]
	pub value: Option<Value>,
	#[serde(default)]
	pub description: Option<FlowDescription>,
	#[serde(default)]
	pub device_tips: Option<Map<String, Value>>,
}

impl FlowNode {
	pub fn moc_id(&self) -> Option<i64> {
		self.moc_id.as_ref().and_then(numeric).map(|v| v as i64)
	}

	/// Numeric node value, accepting numbers and numeric strings.
	pub fn numeric_value(&self) -> Option<f64> {
		self.value.as_ref().and_then(numeric)
	}

	/// Human-readable value, e.g. `"1.234 kW"`.
	pub fn display_value(&self) -> Option<String> {
		self.description.as_ref().and_then(FlowDescription::display_value)
	}

	/// Looks up a `deviceTips` entry such as `SOC` or `CHARGE_MODE_VALUE`.
	pub fn tip(&self, key: &str) -> Option<&Value> {
		self.device_tips.as_ref().and_then(|tips| tips.get(key))
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowLink {
	#[serde(default)]
	pub description: Option<FlowDescription>,
	/// `"FORWARD"` or `"BACKWARD"`; direction semantics depend on the link.
	#[serde(default)]
	pub flowing: Option<String>,
}

impl FlowLink {
	pub fn display_value(&self) -> Option<String> {
		self.description.as_ref().and_then(FlowDescription::display_value)
	}

	pub fn is_forward(&self) -> bool {
		self.flowing.as_deref() == Some("FORWARD")
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDescription {
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub value: Option<Value>,
}

impl FlowDescription {
	pub fn display_value(&self) -> Option<String> {
		match self.value.as_ref()? {
			Value::String(s) => Some(s.clone()),
			Value::Null => None,
			other => Some(other.to_string()),
		}
	}
}

/// Interprets a JSON number or a string with a leading number (`"0.512 kW"`, `"87%"`).
pub fn numeric(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => leading_number(s),
		_ => None,
	}
}

/// Parses the leading decimal number of a display string.
pub fn leading_number(text: &str) -> Option<f64> {
	let trimmed = text.trim_start();
	let end = trimmed
		.char_indices()
		.find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
		.map(|(i, _)| i)
		.unwrap_or(trimmed.len());
	trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn tolerates_missing_nodes() {
		let response: EnergyFlowResponse = serde_json::from_value(json!({"data": {}})).unwrap();
		assert!(response.flow().is_none());

		let response: EnergyFlowResponse = serde_json::from_value(json!({"data": {"flow": {}}})).unwrap();
		let flow = response.flow().unwrap();
		assert!(flow.nodes.is_empty());
		assert!(flow.links.is_empty());
	}

	#[test]
	fn node_and_link_lookup() {
		let flow: Flow = serde_json::from_value(json!({
			"nodes": [
				{"name": "load", "value": "1.5", "mocId": 20812, "description": {"value": "1.500 kW"}},
				{"name": "battery", "deviceTips": {"SOC": 87}}
			],
			"links": [
				{"description": {"label": "buy", "value": "0.300 kW"}, "flowing": "FORWARD"}
			]
		}))
		.unwrap();

		let load = flow.node("load").unwrap();
		assert_eq!(load.numeric_value(), Some(1.5));
		assert_eq!(load.moc_id(), Some(20812));
		assert_eq!(load.display_value().as_deref(), Some("1.500 kW"));
		assert_eq!(flow.node("battery").unwrap().tip("SOC"), Some(&json!(87)));
		assert!(flow.link("buy").unwrap().is_forward());
		assert!(flow.link("sell").is_none());
	}

	#[test]
	fn leading_number_handles_units() {
		assert_eq!(leading_number("0.512 kW"), Some(0.512));
		assert_eq!(leading_number("87%"), Some(87.0));
		assert_eq!(leading_number("-1.2kW"), Some(-1.2));
		assert_eq!(leading_number("kW"), None);
		assert_eq!(leading_number(""), None);
	}
}
