//! Application-level status markers carried in portal JSON bodies.

use serde_json::Value;

/// Returns the application-level error marker of a portal response body, if any.
///
/// The portal answers rejected sessions with a success status and a body such as
/// `{"error": "..."}` or `{"success": false, "failCode": 305}`. A body that is not a
/// JSON object (for example an HTML login page) is itself treated as an error.
pub fn error_marker(body: &Value) -> Option<String> {
	let Some(object) = body.as_object() else {
		return Some("response body is not a JSON object".to_string());
	};

	match object.get("error") {
		None | Some(Value::Null) | Some(Value::Bool(false)) => {}
		Some(Value::String(message)) if message.is_empty() => {}
		Some(Value::String(message)) => return Some(message.clone()),
		Some(other) => return Some(other.to_string()),
	}

	if object.get("success").and_then(Value::as_bool) == Some(false) {
		let code = object
			.get("failCode")
			.map(Value::to_string)
			.unwrap_or_else(|| "unknown".to_string());
		return Some(format!("success=false (failCode {code})"));
	}

	None
}
