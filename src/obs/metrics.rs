// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `compliance_broker_flow_total` through the global recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"compliance_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		for kind in [FlowKind::TokenExchange, FlowKind::ComplianceCheck, FlowKind::Remediation] {
			record_flow_outcome(kind, FlowOutcome::Attempt);
		}
	}
}
