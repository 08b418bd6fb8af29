//! Token exchanger that delegates to a running broker over HTTP.

// crates.io
use oauth2::http::{
	Method,
	header::{ACCEPT, CONTENT_TYPE, SET_COOKIE},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, ErrorBody, UpstreamError},
	flows::{ExchangeFuture, TokenExchangeRequest, TokenExchanger},
	http::{BrokerHttpClient, ReqwestHttpClient},
	oauth::{self, CallTarget, ReqwestTransportErrorMapper, TransportErrorMapper},
	session::SessionContext,
};

/// Path of the broker's token-exchange endpoint.
pub const TOKEN_EXCHANGE_PATH: &str = "/api/auth/token";

/// Posts `{code, clientId}` to a broker and reads the session from its cookies.
pub struct RemoteTokenExchanger<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	endpoint: Url,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> RemoteTokenExchanger<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Targets the exchange endpoint under `server`.
	pub fn with_http_client(
		server: &Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let endpoint = server
			.join(TOKEN_EXCHANGE_PATH)
			.map_err(|source| ConfigError::InvalidUrl { what: "broker server", source })?;

		Ok(Self { endpoint, http_client: http_client.into(), transport_mapper: mapper.into() })
	}

	/// Fully resolved exchange endpoint.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn post(&self, request: &TokenExchangeRequest) -> Result<SessionContext> {
		let body = serde_json::to_vec(request)
			.map_err(|e| Error::internal(format!("Failed to encode exchange request: {e}")))?;
		let http_request = oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(body)
			.map_err(ConfigError::from)?;
		let response = oauth::dispatch(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			CallTarget::ExchangeEndpoint,
			http_request,
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			let (message, details) = match serde_json::from_slice::<ErrorBody>(response.body()) {
				Ok(body) => (body.error, body.details),
				Err(_) => (
					status.canonical_reason().unwrap_or("Token exchange failed").to_owned(),
					Some(oauth::passthrough_details(response.body())),
				),
			};

			return Err(
				UpstreamError::ExchangeEndpoint { status: status.as_u16(), message, details }.into()
			);
		}

		let cookies = response.headers().get_all(SET_COOKIE).iter().filter_map(|v| v.to_str().ok());

		SessionContext::from_set_cookie_headers(cookies, OffsetDateTime::now_utc())
	}
}
impl RemoteTokenExchanger {
	/// Targets `server` with a reqwest transport honoring `timeout`.
	pub fn new(server: &Url, timeout: Option<std::time::Duration>) -> Result<Self, ConfigError> {
		Self::with_http_client(
			server,
			ReqwestHttpClient::with_timeout(timeout)?,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> TokenExchanger for RemoteTokenExchanger<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(&'a self, code: &'a str, client_id: &'a str) -> ExchangeFuture<'a> {
		Box::pin(async move { self.post(&TokenExchangeRequest::new(code, client_id)).await })
	}
}
impl<C, M> Debug for RemoteTokenExchanger<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RemoteTokenExchanger").field("endpoint", &self.endpoint.as_str()).finish()
	}
}
