//! HTTP surface: `POST /api/auth/token` and `GET /health`.
//!
//! The token handler never lets a failure escape: every [`Error`] is rendered through
//! [`Error::status_code`] and [`Error::to_body`], and request bodies that cannot be decoded
//! become a generic 500.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	http::{HeaderValue, StatusCode, header::SET_COOKIE},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	config::AppConfig,
	error::TransportError,
	flows::{Broker, TokenExchangeRequest},
	http::BrokerHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind},
};

/// Shared handler state.
pub struct ServerState<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	broker: Broker<C, M>,
	secure_cookies: bool,
}
impl<C, M> ServerState<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps a broker; `secure_cookies` adds the `Secure` attribute.
	pub fn new(broker: Broker<C, M>, secure_cookies: bool) -> Self {
		Self { broker, secure_cookies }
	}
}

/// Builds the router for the given broker.
pub fn router<C, M>(state: ServerState<C, M>) -> Router
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	Router::new()
		.route("/api/auth/token", post(exchange_token::<C, M>))
		.route("/health", get(health))
		.layer(TraceLayer::new_for_http())
		.with_state(Arc::new(state))
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn serve(config: &AppConfig) -> Result<SocketAddr> {
	let broker = config.build_broker()?;

	if broker.client_secret.is_none() {
		tracing::warn!(
			"No client secret configured; token exchanges will fail with a configuration error."
		);
	}

	let app = router(ServerState::new(broker, config.secure_cookies()));
	let listener = TcpListener::bind(config.bind_addr).await.map_err(TransportError::from)?;
	let addr = listener.local_addr().map_err(TransportError::from)?;

	tracing::info!(%addr, environment = %config.environment, "Token exchange server listening.");

	serve_on(listener, app, async {
		let _ = tokio::signal::ctrl_c().await;

		tracing::info!("Shutdown signal received.");
	})
	.await
	.map_err(TransportError::from)?;

	Ok(addr)
}

async fn exchange_token<C, M>(State(state): State<Arc<ServerState<C, M>>>, body: Bytes) -> Response
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut de = serde_json::Deserializer::from_slice(&body);
	let request: TokenExchangeRequest = match serde_path_to_error::deserialize(&mut de) {
		Ok(request) => request,
		Err(e) => {
			let error = Error::internal(format!("Unreadable token exchange request: {e}"));

			obs::warn_flow_failure(FlowKind::TokenExchange, "decode_request", &error);

			return error_response(&error);
		},
	};

	match state.broker.exchange_token(request).await {
		Ok(credential) => {
			let mut response = Json(json!({ "success": true })).into_response();

			for cookie in credential.cookies(state.secure_cookies) {
				match HeaderValue::from_str(&cookie.to_header_value()) {
					Ok(value) => {
						response.headers_mut().append(SET_COOKIE, value);
					},
					Err(e) => return error_response(&Error::internal(e.to_string())),
				}
			}

			response
		},
		Err(error) => error_response(&error),
	}
}

async fn health() -> Json<JsonValue> {
	Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

fn error_response(error: &Error) -> Response {
	let status =
		StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	(status, Json(error.to_body())).into_response()
}
