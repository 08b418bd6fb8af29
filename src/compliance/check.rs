//! Check kinds and the per-check state they drive.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, compliance::ComplianceReport};

/// Detail recorded when a check call fails for any reason.
pub const CHECK_FAILED_MESSAGE: &str = "Failed to run check";

/// Closed set of compliance audits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
	/// Multi-factor authentication coverage per user.
	Mfa,
	/// Row-level security enablement per table.
	Rls,
	/// Point-in-time recovery enablement per project.
	Pitr,
}
impl CheckKind {
	/// Every kind, in the order `run_all` executes them.
	pub const ALL: [CheckKind; 3] = [CheckKind::Mfa, CheckKind::Rls, CheckKind::Pitr];

	/// Stable identifier.
	pub const fn id(self) -> &'static str {
		match self {
			CheckKind::Mfa => "mfa",
			CheckKind::Rls => "rls",
			CheckKind::Pitr => "pitr",
		}
	}

	/// Endpoint label relative to `/api/compliance/`.
	pub const fn endpoint(self) -> &'static str {
		match self {
			CheckKind::Mfa => "mfa-check",
			CheckKind::Rls => "rls-check",
			CheckKind::Pitr => "pitr-check",
		}
	}

	/// Absolute endpoint path on the compliance API.
	pub const fn endpoint_path(self) -> &'static str {
		match self {
			CheckKind::Mfa => "/api/compliance/mfa-check",
			CheckKind::Rls => "/api/compliance/rls-check",
			CheckKind::Pitr => "/api/compliance/pitr-check",
		}
	}

	/// Display name.
	pub const fn name(self) -> &'static str {
		match self {
			CheckKind::Mfa => "Multi-Factor Authentication",
			CheckKind::Rls => "Row Level Security",
			CheckKind::Pitr => "Point in Time Recovery",
		}
	}

	/// One-line description.
	pub const fn description(self) -> &'static str {
		match self {
			CheckKind::Mfa => "Check if MFA is enabled for each user",
			CheckKind::Rls => "Check if RLS is enabled for all tables",
			CheckKind::Pitr => "Check if PITR is enabled for all projects",
		}
	}

	/// `summary` field holding the audited population size.
	pub const fn total_field(self) -> &'static str {
		match self {
			CheckKind::Mfa => "totalUsers",
			CheckKind::Rls => "totalTables",
			CheckKind::Pitr => "totalProjects",
		}
	}

	/// Plural noun for the audited population.
	pub const fn subject(self) -> &'static str {
		match self {
			CheckKind::Mfa => "users",
			CheckKind::Rls => "tables",
			CheckKind::Pitr => "projects",
		}
	}

	/// Fields tried, in order, to label an entry of the `failing` array.
	pub const fn failing_label_fields(self) -> &'static [&'static str] {
		match self {
			CheckKind::Mfa => &["email", "id"],
			CheckKind::Rls => &["table", "name", "id"],
			CheckKind::Pitr => &["name", "ref", "id"],
		}
	}

	/// Operator guidance shown for failing checks.
	pub const fn remediation_hint(self) -> &'static str {
		match self {
			CheckKind::Mfa => "Ask the listed users to enroll a second factor (TOTP).",
			CheckKind::Rls => "Enable RLS on the listed tables.",
			CheckKind::Pitr => "Enable the Point in Time Recovery add-on for the listed projects.",
		}
	}

	/// Whether the compliance API offers an automated fix.
	pub const fn supports_remediation(self) -> bool {
		match self {
			CheckKind::Rls => true,
			CheckKind::Mfa | CheckKind::Pitr => false,
		}
	}
}
impl Display for CheckKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.id())
	}
}
impl FromStr for CheckKind {
	type Err = UnknownCheckKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.id().eq_ignore_ascii_case(s) || kind.endpoint() == s)
			.ok_or_else(|| UnknownCheckKind(s.to_owned()))
	}
}

/// Error returned when parsing an unknown check identifier.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown compliance check `{0}`; expected one of mfa, rls, pitr.")]
pub struct UnknownCheckKind(pub String);

/// Lifecycle state of a single check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
	/// Awaiting its first run or an in-flight response.
	Pending,
	/// Reported exactly 100% compliance.
	Passing,
	/// Reported anything other than 100%.
	Failing,
	/// The call failed (transport, HTTP status, body, or session).
	Errored,
}
impl CheckStatus {
	/// Returns `true` for `passing`, `failing`, and `errored`.
	pub const fn is_terminal(self) -> bool {
		!matches!(self, CheckStatus::Pending)
	}
}

/// Retained outcome of the latest completed call.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckResult {
	/// Parsed payload of a 2xx response.
	Report(ComplianceReport),
	/// Generic failure detail.
	Error {
		/// Message safe to show to users.
		message: String,
	},
}

/// One audit together with its latest state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
	/// Which audit this is.
	#[serde(rename = "id")]
	pub kind: CheckKind,
	/// Display name.
	pub name: &'static str,
	/// One-line description.
	pub description: &'static str,
	/// Current lifecycle state.
	pub status: CheckStatus,
	/// Latest completed result, if any.
	pub result: Option<CheckResult>,
	/// Instant of the latest transition out of `pending`.
	#[serde(with = "time::serde::rfc3339::option")]
	pub last_checked: Option<OffsetDateTime>,
}
impl ComplianceCheck {
	/// Fresh `pending` check that has never run.
	pub fn new(kind: CheckKind) -> Self {
		Self {
			kind,
			name: kind.name(),
			description: kind.description(),
			status: CheckStatus::Pending,
			result: None,
			last_checked: None,
		}
	}

	/// The fixed initial list, in execution order.
	pub fn initial_set() -> Vec<Self> {
		CheckKind::ALL.into_iter().map(Self::new).collect()
	}

	/// Marks a request as issued; the previous result stays visible.
	pub fn begin(&mut self) {
		self.status = CheckStatus::Pending;
	}

	/// Marks a request as issued and forgets the previous timestamp.
	pub fn reset(&mut self) {
		self.status = CheckStatus::Pending;
		self.last_checked = None;
	}

	/// Applies a call outcome and stamps `now`.
	pub fn complete(&mut self, outcome: Result<ComplianceReport>, now: OffsetDateTime) {
		match outcome {
			Ok(report) => {
				self.status =
					if report.is_passing() { CheckStatus::Passing } else { CheckStatus::Failing };
				self.result = Some(CheckResult::Report(report));
			},
			Err(_) => {
				self.status = CheckStatus::Errored;
				self.result = Some(CheckResult::Error { message: CHECK_FAILED_MESSAGE.into() });
			},
		}

		self.last_checked = Some(now);
	}

	/// Report of the latest successful call, if the latest call succeeded.
	pub fn report(&self) -> Option<&ComplianceReport> {
		match &self.result {
			Some(CheckResult::Report(report)) => Some(report),
			_ => None,
		}
	}

	/// `last_checked` formatted as RFC 3339.
	pub fn last_checked_rfc3339(&self) -> Option<String> {
		self.last_checked.and_then(|instant| instant.format(&Rfc3339).ok())
	}
}
