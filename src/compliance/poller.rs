//! Sequential compliance poller.
//!
//! Check state sits behind a synchronous lock that is never held across an `.await`, so
//! [`CompliancePoller::snapshot`] stays cheap while calls are in flight. `run_all` additionally
//! holds an async guard for its whole duration so overlapping runs queue instead of
//! interleaving.

// self
use crate::{
	_prelude::*,
	compliance::{CheckKind, CheckStatus, ComplianceApi, ComplianceCheck},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionContext,
};

/// Owns the fixed check list and drives it through the compliance API.
pub struct CompliancePoller {
	api: Arc<dyn ComplianceApi>,
	checks: RwLock<Vec<ComplianceCheck>>,
	run_guard: AsyncMutex<()>,
}
impl CompliancePoller {
	/// Creates a poller with every check `pending`.
	pub fn new(api: Arc<dyn ComplianceApi>) -> Self {
		Self {
			api,
			checks: RwLock::new(ComplianceCheck::initial_set()),
			run_guard: AsyncMutex::new(()),
		}
	}

	/// Copy of the current check list, in execution order.
	pub fn snapshot(&self) -> Vec<ComplianceCheck> {
		self.checks.read().clone()
	}

	/// Copy of a single check.
	pub fn check(&self, kind: CheckKind) -> Option<ComplianceCheck> {
		self.checks.read().iter().find(|check| check.kind == kind).cloned()
	}

	/// `true` while a [`CompliancePoller::run_all`] call is in flight.
	pub fn is_running_all(&self) -> bool {
		self.run_guard.try_lock().is_none()
	}

	/// Runs one check and returns its resulting status.
	pub async fn run_check(&self, session: &SessionContext, kind: CheckKind) -> CheckStatus {
		self.update(kind, ComplianceCheck::begin);

		let span = FlowSpan::new(FlowKind::ComplianceCheck, kind.id());

		obs::record_flow_outcome(FlowKind::ComplianceCheck, FlowOutcome::Attempt);

		let outcome = span.instrument(self.api.fetch_report(session, kind)).await;

		obs::observe_result(FlowKind::ComplianceCheck, kind.id(), &outcome);

		let now = OffsetDateTime::now_utc();

		self.update(kind, |check| check.complete(outcome, now))
	}

	/// Resets every check, then runs MFA, RLS, and PITR one after another.
	pub async fn run_all(&self, session: &SessionContext) -> Vec<ComplianceCheck> {
		let _running = self.run_guard.lock().await;

		self.checks.write().iter_mut().for_each(ComplianceCheck::reset);

		for kind in CheckKind::ALL {
			self.run_check(session, kind).await;
		}

		self.snapshot()
	}

	/// Applies the automated RLS fix, re-running the RLS check once on success.
	///
	/// A failed fix leaves the RLS check untouched and is returned for display.
	pub async fn fix_rls(&self, session: &SessionContext) -> Result<CheckStatus> {
		const KIND: FlowKind = FlowKind::Remediation;

		let span = FlowSpan::new(KIND, "fix_rls");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let fixed = span.instrument(self.api.fix_rls(session)).await;

		obs::observe_result(KIND, "fix_rls", &fixed);
		fixed?;

		Ok(self.run_check(session, CheckKind::Rls).await)
	}

	fn update<F>(&self, kind: CheckKind, f: F) -> CheckStatus
	where
		F: FnOnce(&mut ComplianceCheck),
	{
		let mut checks = self.checks.write();

		match checks.iter_mut().find(|check| check.kind == kind) {
			Some(check) => {
				f(check);

				check.status
			},
			None => CheckStatus::Pending,
		}
	}
}
impl Debug for CompliancePoller {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CompliancePoller")
			.field("checks", &*self.checks.read())
			.field("running_all", &self.is_running_all())
			.finish()
	}
}
