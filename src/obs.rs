//! Optional observability helpers for token exchange, compliance checks, and remediation.
//!
//! # Feature Flags
//!
//! - `tracing` emits spans named `compliance_broker.flow` carrying `flow` and `stage` fields,
//!   plus a `warn` event for every failure handed back to a caller.
//! - `metrics` increments `compliance_broker_flow_total`, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization-code exchange.
	TokenExchange,
	/// Single compliance check call.
	ComplianceCheck,
	/// Automated RLS remediation.
	Remediation,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::ComplianceCheck => "compliance_check",
			FlowKind::Remediation => "remediation",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Operation started.
	Attempt,
	/// Operation completed.
	Success,
	/// Operation failed.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records `outcome` for `kind` and, on failure, logs `error` under `stage`.
pub fn observe_result<T>(kind: FlowKind, stage: &'static str, result: &Result<T>) {
	match result {
		Ok(_) => record_flow_outcome(kind, FlowOutcome::Success),
		Err(error) => {
			record_flow_outcome(kind, FlowOutcome::Failure);
			warn_flow_failure(kind, stage, error);
		},
	}
}
