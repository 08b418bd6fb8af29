//! Payload returned by a compliance check endpoint.

// self
use crate::{_prelude::*, compliance::CheckKind};

/// Full JSON payload of a 2xx check response.
///
/// Only `summary.percentageCompliant` decides pass/fail; everything else is kept for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceReport(JsonValue);
impl ComplianceReport {
	/// Wraps a decoded payload.
	pub fn new(payload: JsonValue) -> Self {
		Self(payload)
	}

	/// Raw payload.
	pub fn payload(&self) -> &JsonValue {
		&self.0
	}

	/// `summary.percentageCompliant`, when it is a number.
	pub fn percentage_compliant(&self) -> Option<f64> {
		self.0.pointer("/summary/percentageCompliant").and_then(JsonValue::as_f64)
	}

	/// `true` iff the reported percentage is exactly 100.
	pub fn is_passing(&self) -> bool {
		self.percentage_compliant() == Some(100.0)
	}

	/// Counts reported under `summary` for `kind`.
	pub fn summary(&self, kind: CheckKind) -> ReportSummary {
		let field = |name: &str| self.0.get("summary").and_then(|summary| summary.get(name));

		ReportSummary {
			percentage_compliant: self.percentage_compliant(),
			total: field(kind.total_field()).and_then(JsonValue::as_u64),
			passing: field("passingCount").and_then(JsonValue::as_u64),
		}
	}

	/// Entries of the `failing` array; empty when absent.
	pub fn failing(&self) -> &[JsonValue] {
		self.array("failing")
	}

	/// Entries of the optional `projectDetails` array; empty when absent.
	pub fn project_details(&self) -> &[JsonValue] {
		self.array("projectDetails")
	}

	/// Human-readable label for every failing entry.
	pub fn failing_labels(&self, kind: CheckKind) -> Vec<String> {
		self.failing().iter().map(|entry| entry_label(kind, entry)).collect()
	}

	fn array(&self, key: &str) -> &[JsonValue] {
		self.0.get(key).and_then(JsonValue::as_array).map(Vec::as_slice).unwrap_or_default()
	}
}

/// Counts extracted from a report's `summary` object.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReportSummary {
	/// `percentageCompliant`.
	pub percentage_compliant: Option<f64>,
	/// Kind-specific `total*` field.
	pub total: Option<u64>,
	/// `passingCount`.
	pub passing: Option<u64>,
}

fn entry_label(kind: CheckKind, entry: &JsonValue) -> String {
	if let Some(text) = entry.as_str() {
		return text.to_owned();
	}

	kind.failing_label_fields()
		.iter()
		.find_map(|field| match entry.get(*field) {
			Some(JsonValue::String(text)) => Some(text.clone()),
			Some(JsonValue::Number(number)) => Some(number.to_string()),
			_ => None,
		})
		.map(|label| match entry.get("schema").and_then(JsonValue::as_str) {
			Some(schema) if kind == CheckKind::Rls => format!("{schema}.{label}"),
			_ => label,
		})
		.unwrap_or_else(|| entry.to_string())
}
