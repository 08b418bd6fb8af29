#![cfg(feature = "server")]

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	http::{StatusCode, header::LOCATION},
	response::IntoResponse,
	routing::post,
};
use serde_json::json;
use tokio::net::TcpListener;
// self
use compliance_broker::{
	_preludet::*,
	auth::ProviderId,
	config::AppConfig,
	error::{TransportError, UpstreamError},
	flows::TokenExchangeRequest,
	provider::ProviderDescriptor,
};

async fn redirecting_token() -> impl IntoResponse {
	(StatusCode::FOUND, [(LOCATION, "/v1/oauth/issued")])
}

async fn issued_token() -> Json<JsonValue> {
	Json(json!({ "access_token": "followed", "token_type": "bearer", "expires_in": 60 }))
}

async fn slow_token() -> Json<JsonValue> {
	tokio::time::sleep(std::time::Duration::from_secs(3)).await;

	issued_token().await
}

async fn spawn_provider() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Provider should bind.");
	let addr = listener.local_addr().expect("Provider should expose its address.");
	let app = Router::new()
		.route("/v1/oauth/token", post(redirecting_token))
		.route("/v1/oauth/issued", post(issued_token))
		.route("/v1/oauth/slow", post(slow_token));

	tokio::spawn(async move { axum::serve(listener, app).await });

	addr
}

fn config(addr: SocketAddr, token_path: &str, timeout: Option<std::time::Duration>) -> AppConfig {
	let base = format!("http://{addr}");
	let mut config = AppConfig::new()
		.expect("Default configuration should build.")
		.with_client_secret(Some("s3cret".into()));

	config.request_timeout = timeout;
	config.descriptor =
		ProviderDescriptor::builder(ProviderId::new("local").expect("Provider id should be valid."))
			.authorization_endpoint(
				Url::parse(&format!("{base}/v1/oauth/authorize")).expect("URL should parse."),
			)
			.token_endpoint(Url::parse(&format!("{base}{token_path}")).expect("URL should parse."))
			.build()
			.expect("Descriptor should build.");

	config
}

#[tokio::test]
async fn configured_broker_does_not_follow_redirects() {
	let addr = spawn_provider().await;
	let broker = config(addr, "/v1/oauth/token", Some(std::time::Duration::from_secs(5)))
		.build_broker()
		.expect("Broker should build.");
	let err = broker
		.exchange_token(TokenExchangeRequest::new("code-1", "client-1"))
		.await
		.expect_err("Redirect should not be followed.");

	assert!(matches!(err, Error::Upstream(UpstreamError::TokenEndpoint { status: 302, .. })));
	assert_eq!(err.status_code(), 302);
}

#[tokio::test]
async fn configured_broker_honors_the_request_timeout() {
	let addr = spawn_provider().await;
	let broker = config(addr, "/v1/oauth/slow", Some(std::time::Duration::from_millis(200)))
		.build_broker()
		.expect("Broker should build.");
	let err = broker
		.exchange_token(TokenExchangeRequest::new("code-1", "client-1"))
		.await
		.expect_err("Slow provider should time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
	assert_eq!(err.to_body().error, "Internal server error");
}
