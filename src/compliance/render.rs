//! Plain-text rendering of check snapshots.

// self
use crate::{
	_prelude::*,
	compliance::{CheckResult, CheckStatus, ComplianceCheck},
};

/// Short tag for a status.
pub const fn status_tag(status: CheckStatus) -> &'static str {
	match status {
		CheckStatus::Pending => "[PENDING]",
		CheckStatus::Passing => "[PASS]",
		CheckStatus::Failing => "[FAIL]",
		CheckStatus::Errored => "[ERROR]",
	}
}

/// Renders every check, separated by blank lines.
pub fn render_checks(checks: &[ComplianceCheck]) -> String {
	checks.iter().map(render_check).collect::<Vec<_>>().join("\n")
}

/// Renders a single check.
pub fn render_check(check: &ComplianceCheck) -> String {
	CheckView(check).to_string()
}

struct CheckView<'a>(&'a ComplianceCheck);
impl Display for CheckView<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let check = self.0;

		writeln!(f, "{} {}", status_tag(check.status), check.name)?;
		writeln!(f, "    {}", check.description)?;

		match (&check.result, check.status) {
			(_, CheckStatus::Pending) | (None, _) => {},
			(Some(CheckResult::Report(report)), status) => {
				let summary = report.summary(check.kind);

				if let (Some(passing), Some(total)) = (summary.passing, summary.total) {
					write!(f, "    {passing}/{total} {} compliant", check.kind.subject())?;

					if let Some(pct) = summary.percentage_compliant {
						write!(f, " ({pct}%)")?;
					}

					writeln!(f)?;
				}

				let failing = report.failing_labels(check.kind);

				if !failing.is_empty() {
					writeln!(f, "    Failing {}:", check.kind.subject())?;

					for label in failing {
						writeln!(f, "      - {label}")?;
					}
				}
				if status == CheckStatus::Failing {
					writeln!(f, "    Hint: {}", check.kind.remediation_hint())?;

					if check.kind.supports_remediation() {
						writeln!(f, "    Automated fix available: compliance-broker fix-rls")?;
					}
				}
			},
			(Some(CheckResult::Error { message }), _) => writeln!(f, "    Error: {message}")?,
		}

		if let Some(at) = check.last_checked_rfc3339() {
			writeln!(f, "    Last checked: {at}")?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{
		compliance::{CheckKind, ComplianceReport},
		error::Error,
	};

	#[test]
	fn failing_rls_check_lists_tables_hint_and_fix() {
		let mut check = ComplianceCheck::new(CheckKind::Rls);

		check.complete(
			Ok(ComplianceReport::new(json!({
				"summary": { "percentageCompliant": 50, "totalTables": 2, "passingCount": 1 },
				"failing": [{ "schema": "public", "table": "orders" }],
			}))),
			datetime!(2025-01-01 12:00 UTC),
		);

		let text = render_check(&check);

		assert!(text.starts_with("[FAIL] Row Level Security\n"));
		assert!(text.contains("    1/2 tables compliant (50%)\n"));
		assert!(text.contains("      - public.orders\n"));
		assert!(text.contains("Hint: Enable RLS"));
		assert!(text.contains("compliance-broker fix-rls"));
		assert!(text.ends_with("    Last checked: 2025-01-01T12:00:00Z\n"));
	}

	#[test]
	fn passing_check_renders_every_line_in_order() {
		let mut check = ComplianceCheck::new(CheckKind::Mfa);

		check.complete(
			Ok(ComplianceReport::new(json!({
				"summary": { "percentageCompliant": 100, "totalUsers": 3, "passingCount": 3 },
				"failing": [],
			}))),
			datetime!(2025-01-01 12:00 UTC),
		);

		let text = render_check(&check);
		let lines = text.lines().collect::<Vec<_>>();

		assert_eq!(lines.len(), 4);
		assert_eq!(lines[0], format!("[PASS] {}", check.name));
		assert_eq!(lines[2], "    3/3 users compliant (100%)");
		assert_eq!(lines[3], "    Last checked: 2025-01-01T12:00:00Z");
		assert!(!text.contains("Hint:"));
	}

	#[test]
	fn errored_and_pending_checks_stay_terse() {
		let mut check = ComplianceCheck::new(CheckKind::Pitr);

		assert_eq!(
			render_check(&check),
			"[PENDING] Point in Time Recovery\n    Check if PITR is enabled for all projects\n"
		);

		check.complete(Err(Error::internal("boom")), datetime!(2025-01-01 12:00 UTC));

		let text = render_check(&check);

		assert!(text.contains("    Error: Failed to run check\n"));
		assert!(!text.contains("boom"));
	}
}
