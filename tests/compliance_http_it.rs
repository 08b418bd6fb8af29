// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use compliance_broker::{
	_preludet::*,
	auth::TokenSecret,
	compliance::{
		CHECK_FAILED_MESSAGE, CheckKind, CheckResult, CheckStatus, ComplianceApi,
		CompliancePoller, HttpComplianceApi,
	},
	error::{TransportError, UpstreamError},
	oauth::ReqwestTransportErrorMapper,
	session::SessionContext,
};

fn api(server: &MockServer, timeout: Option<std::time::Duration>) -> HttpComplianceApi {
	HttpComplianceApi::with_http_client(
		Url::parse(&server.base_url()).expect("Mock base URL should parse."),
		test_reqwest_http_client_with_timeout(timeout),
		ReqwestTransportErrorMapper,
	)
}

fn session() -> SessionContext {
	SessionContext::new(
		TokenSecret::new("token-it"),
		Some(OffsetDateTime::now_utc() + Duration::hours(1)),
	)
}

#[tokio::test]
async fn fetch_report_sends_bearer_and_keeps_payload() {
	let server = MockServer::start_async().await;
	let payload = json!({
		"summary": { "percentageCompliant": 100, "totalTables": 3, "passingCount": 3 },
		"failing": [],
	});
	let body = payload.clone();
	let mock = server
		.mock_async(move |when, then| {
			when.method(GET)
				.path("/api/compliance/rls-check")
				.header("authorization", "Bearer token-it")
				.header("content-type", "application/json");
			then.status(200).json_body(body);
		})
		.await;
	let report = api(&server, None)
		.fetch_report(&session(), CheckKind::Rls)
		.await
		.expect("Report should be fetched.");

	mock.assert_async().await;

	assert!(report.is_passing());
	assert_eq!(report.payload(), &payload);
}

#[tokio::test]
async fn non_success_and_malformed_bodies_fail() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/mfa-check");
			then.status(503);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/pitr-check");
			then.status(200).body("<html>");
		})
		.await;

	let api = api(&server, None);
	let err = api
		.fetch_report(&session(), CheckKind::Mfa)
		.await
		.expect_err("503 should fail the check.");

	assert!(matches!(err, Error::Upstream(UpstreamError::ComplianceApi { status: 503 })));
	assert_eq!(err.to_string(), "API error: 503");

	let err = api
		.fetch_report(&session(), CheckKind::Pitr)
		.await
		.expect_err("HTML body should fail the check.");

	assert!(matches!(
		err,
		Error::Upstream(UpstreamError::ComplianceResponseParse { endpoint: "pitr-check", .. })
	));
}

#[tokio::test]
async fn expired_session_never_reaches_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path_includes("/api/");
			then.status(200).json_body(json!({}));
		})
		.await;
	let expired = SessionContext::new(
		TokenSecret::new("token-it"),
		Some(OffsetDateTime::now_utc() - Duration::minutes(1)),
	);
	let err = api(&server, None)
		.fetch_report(&expired, CheckKind::Mfa)
		.await
		.expect_err("Expired session should fail.");

	assert!(matches!(err, Error::SessionExpired { .. }));
	assert_eq!(err.status_code(), 401);
	assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn fix_rls_requires_success_true() {
	let server = MockServer::start_async().await;
	let mut accepted = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/compliance/fix-rls")
				.header("authorization", "Bearer token-it");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;
	let api = api(&server, None);

	api.fix_rls(&session()).await.expect("Accepted fix should succeed.");
	accepted.assert_async().await;
	accepted.delete_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/compliance/fix-rls");
			then.status(200).json_body(json!({ "success": false }));
		})
		.await;

	let err = api.fix_rls(&session()).await.expect_err("Rejected fix should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::RemediationRejected)));
}

#[tokio::test]
async fn poller_over_http_runs_each_check_and_reruns_rls_after_fix() {
	let server = MockServer::start_async().await;
	let mfa = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/mfa-check");
			then.status(200).json_body(json!({
				"summary": { "percentageCompliant": 50, "totalUsers": 2, "passingCount": 1 },
				"failing": [{ "email": "bob@example.com" }],
			}));
		})
		.await;
	let rls = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/rls-check");
			then.status(200).json_body(json!({ "summary": { "percentageCompliant": 100 } }));
		})
		.await;
	let pitr = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/pitr-check");
			then.status(500);
		})
		.await;
	let fix = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/compliance/fix-rls");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;
	let poller = CompliancePoller::new(Arc::new(api(&server, None)));
	let session = session();
	let checks = poller.run_all(&session).await;

	assert_eq!(
		checks.iter().map(|check| (check.kind, check.status)).collect::<Vec<_>>(),
		[
			(CheckKind::Mfa, CheckStatus::Failing),
			(CheckKind::Rls, CheckStatus::Passing),
			(CheckKind::Pitr, CheckStatus::Errored),
		]
	);
	assert_eq!(
		checks[2].result,
		Some(CheckResult::Error { message: CHECK_FAILED_MESSAGE.into() })
	);
	assert!(checks.iter().all(|check| check.last_checked.is_some()));

	let status = poller.fix_rls(&session).await.expect("Fix should succeed.");

	assert_eq!(status, CheckStatus::Passing);
	assert_eq!(mfa.hits_async().await, 1);
	assert_eq!(rls.hits_async().await, 2);
	assert_eq!(pitr.hits_async().await, 1);
	assert_eq!(fix.hits_async().await, 1);
}

#[tokio::test]
async fn slow_responses_time_out_into_errored_checks() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/compliance/mfa-check");
			then.status(200)
				.delay(std::time::Duration::from_secs(5))
				.json_body(json!({ "summary": { "percentageCompliant": 100 } }));
		})
		.await;

	let api = api(&server, Some(std::time::Duration::from_millis(200)));
	let err = api
		.fetch_report(&session(), CheckKind::Mfa)
		.await
		.expect_err("Slow response should time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));

	let poller = CompliancePoller::new(Arc::new(api));

	assert_eq!(poller.run_check(&session(), CheckKind::Mfa).await, CheckStatus::Errored);
}
