// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use compliance_broker::{
	_preludet::*,
	error::UpstreamError,
	flows::{RemoteTokenExchanger, TokenExchanger},
	oauth::ReqwestTransportErrorMapper,
};

fn exchanger(server: &MockServer) -> RemoteTokenExchanger {
	let base = Url::parse(&server.base_url()).expect("Mock base URL should parse.");

	RemoteTokenExchanger::with_http_client(
		&base,
		test_reqwest_http_client(),
		ReqwestTransportErrorMapper,
	)
	.expect("Remote exchanger should build.")
}

#[tokio::test]
async fn session_is_read_from_set_cookie_headers() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/token")
				.header("content-type", "application/json")
				.json_body(json!({ "code": "code-1", "clientId": "client-1" }));
			then.status(200)
				.header("set-cookie", "supabase_client_id=client-1; Path=/; Max-Age=3600; HttpOnly")
				.header("set-cookie", "supabase_access_token=tok-1; Path=/; Max-Age=3600")
				.json_body(json!({ "success": true }));
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let session =
		exchanger(&server).exchange("code-1", "client-1").await.expect("Exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(session.access_token().expose(), "tok-1");

	let expires_at = session.expires_at().expect("Max-Age should resolve to an expiry.");

	assert!(expires_at >= before + Duration::seconds(3600));
	assert!(expires_at <= OffsetDateTime::now_utc() + Duration::seconds(3600));
}

#[tokio::test]
async fn rejection_carries_status_message_and_details() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/token");
			then.status(401).json_body(json!({
				"error": "Failed to exchange token",
				"details": { "error": "invalid_grant" },
			}));
		})
		.await;

	let err = exchanger(&server)
		.exchange("bad-code", "client-1")
		.await
		.expect_err("Rejected code should fail.");

	match err {
		Error::Upstream(UpstreamError::ExchangeEndpoint { status, message, details }) => {
			assert_eq!(status, 401);
			assert_eq!(message, "Failed to exchange token");
			assert_eq!(details, Some(json!({ "error": "invalid_grant" })));
		},
		other => panic!("Expected an exchange endpoint error, got {other:?}."),
	}
}

#[tokio::test]
async fn success_without_cookie_is_an_error() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/token");
			then.status(200).json_body(json!({ "success": true }));
		})
		.await;

	let err = exchanger(&server)
		.exchange("code-1", "client-1")
		.await
		.expect_err("Missing cookie should fail.");

	assert!(matches!(err, Error::Upstream(UpstreamError::MissingSessionCookie)));
}

#[cfg(feature = "server")]
#[tokio::test]
async fn exchanges_through_a_running_broker() {
	// crates.io
	use tokio::net::TcpListener;
	// self
	use compliance_broker::{
		auth::ProviderId,
		provider::{ClientAuthMethod, ProviderDescriptor},
		server::{self, ServerState},
	};

	let provider = MockServer::start_async().await;
	let token = provider
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/oauth/token")
				.query_param("client_id", "client-1")
				.query_param("client_secret", "s3cret");
			then.status(200).json_body(json!({
				"access_token": "provider-token",
				"token_type": "bearer",
				"expires_in": 600,
			}));
		})
		.await;
	let descriptor =
		ProviderDescriptor::builder(ProviderId::new("mock").expect("Provider id should be valid."))
			.authorization_endpoint(
				Url::parse(&provider.url("/v1/oauth/authorize")).expect("URL should parse."),
			)
			.token_endpoint(
				Url::parse(&provider.url("/v1/oauth/token")).expect("URL should parse."),
			)
			.client_auth_method(ClientAuthMethod::ClientSecretQuery)
			.build()
			.expect("Descriptor should build.");
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Listener should bind.");
	let addr = listener.local_addr().expect("Listener should expose its address.");
	let broker = build_reqwest_test_broker(descriptor, Some("s3cret"));

	tokio::spawn(server::serve_on(
		listener,
		server::router(ServerState::new(broker, false)),
		std::future::pending(),
	));

	let base = Url::parse(&format!("http://{addr}")).expect("Broker URL should parse.");
	let session = RemoteTokenExchanger::new(&base, None)
		.expect("Remote exchanger should build.")
		.exchange("code-1", "client-1")
		.await
		.expect("Exchange through the broker should succeed.");

	token.assert_async().await;

	assert_eq!(session.access_token().expose(), "provider-token");
	assert!(session.expires_at().is_some());
}
