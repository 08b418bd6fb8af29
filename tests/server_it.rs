#![cfg(feature = "server")]

// std
use std::net::SocketAddr;
// crates.io
use httpmock::prelude::*;
use reqwest::{StatusCode, header::SET_COOKIE};
use serde_json::json;
use tokio::net::TcpListener;
// self
use compliance_broker::{
	_preludet::*,
	auth::ProviderId,
	provider::ProviderDescriptor,
	server::{self, ServerState},
};

fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	ProviderDescriptor::builder(
		ProviderId::new("mock-supabase").expect("Provider identifier should be valid."),
	)
	.authorization_endpoint(
		Url::parse(&server.url("/v1/oauth/authorize")).expect("Authorize URL should parse."),
	)
	.token_endpoint(Url::parse(&server.url("/v1/oauth/token")).expect("Token URL should parse."))
	.build()
	.expect("Provider descriptor should build successfully.")
}

async fn spawn_broker(descriptor: ProviderDescriptor, secret: Option<&str>) -> SocketAddr {
	let listener =
		TcpListener::bind("127.0.0.1:0").await.expect("Ephemeral listener should bind.");
	let addr = listener.local_addr().expect("Listener should expose its address.");
	let app = server::router(ServerState::new(build_reqwest_test_broker(descriptor, secret), true));

	tokio::spawn(server::serve_on(listener, app, std::future::pending()));

	addr
}

async fn read_json(response: reqwest::Response) -> JsonValue {
	let bytes = response.bytes().await.expect("Response body should be readable.");

	serde_json::from_slice(&bytes).expect("Response body should be JSON.")
}

async fn post_token(addr: SocketAddr, body: &str) -> reqwest::Response {
	reqwest::Client::new()
		.post(format!("http://{addr}/api/auth/token"))
		.header("content-type", "application/json")
		.body(body.to_owned())
		.send()
		.await
		.expect("Request to the broker should complete.")
}

#[tokio::test]
async fn successful_exchange_sets_both_cookies() {
	let provider = MockServer::start_async().await;
	let mock = provider
		.mock_async(|when, then| {
			when.method(POST).path("/v1/oauth/token").query_param("client_id", "client-1");
			then.status(200).json_body(json!({ "access_token": "abc", "expires_in": 3600 }));
		})
		.await;
	let addr = spawn_broker(build_descriptor(&provider), Some("secret")).await;
	let response = post_token(addr, r#"{"code":"the-code","clientId":"client-1"}"#).await;

	mock.assert_async().await;

	assert_eq!(response.status(), StatusCode::OK);

	let cookies: Vec<_> = response
		.headers()
		.get_all(SET_COOKIE)
		.iter()
		.map(|value| value.to_str().expect("Cookie header should be ASCII.").to_owned())
		.collect();

	assert_eq!(
		cookies,
		[
			"supabase_access_token=abc; Path=/; Max-Age=3600; Secure",
			"supabase_client_id=client-1; Path=/; Max-Age=3600; HttpOnly; Secure",
		]
	);
	assert_eq!(read_json(response).await, json!({ "success": true }));
}

#[tokio::test]
async fn failures_map_to_status_and_generic_bodies() {
	let provider = MockServer::start_async().await;

	provider
		.mock_async(|when, then| {
			when.method(POST).path("/v1/oauth/token");
			then.status(401).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;

	let addr = spawn_broker(build_descriptor(&provider), Some("secret")).await;
	let cases = [
		(r#"{"clientId":"client-1"}"#, 400, json!({ "error": "Authorization code is required" })),
		(r#"{"code":"c","clientId":""}"#, 400, json!({ "error": "Client ID is required" })),
		("not json", 500, json!({ "error": "Internal server error" })),
		(
			r#"{"code":"c","clientId":"client-1"}"#,
			401,
			json!({ "error": "Failed to exchange token", "details": { "error": "invalid_grant" } }),
		),
	];

	for (body, status, expected) in cases {
		let response = post_token(addr, body).await;

		assert_eq!(response.status().as_u16(), status, "Unexpected status for {body}.");
		assert!(response.headers().get(SET_COOKIE).is_none());
		assert_eq!(read_json(response).await, expected);
	}
}

#[tokio::test]
async fn missing_secret_is_a_configuration_error() {
	let provider = MockServer::start_async().await;
	let addr = spawn_broker(build_descriptor(&provider), None).await;
	let response = post_token(addr, r#"{"code":"c","clientId":"client-1"}"#).await;

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(read_json(response).await, json!({ "error": "Server configuration error" }));
}

#[tokio::test]
async fn health_reports_version() {
	let provider = MockServer::start_async().await;
	let addr = spawn_broker(build_descriptor(&provider), None).await;
	let response = reqwest::get(format!("http://{addr}/health"))
		.await
		.expect("Health request should complete.");
	let body = read_json(response).await;

	assert_eq!(body, json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }));
}
