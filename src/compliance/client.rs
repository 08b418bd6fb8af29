//! Authenticated calls to the external compliance API.

// crates.io
use oauth2::http::{
	Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	compliance::{CheckKind, ComplianceReport},
	error::{ConfigError, UpstreamError},
	http::{BrokerHttpClient, ReqwestHttpClient},
	oauth::{self, CallTarget, ReqwestTransportErrorMapper, TransportErrorMapper},
	session::SessionContext,
};

/// Path of the RLS remediation endpoint.
pub const FIX_RLS_PATH: &str = "/api/compliance/fix-rls";

/// Boxed future returned by [`ComplianceApi`] implementations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Compliance API operations used by the poller.
pub trait ComplianceApi
where
	Self: Send + Sync,
{
	/// Runs the check for `kind` and returns its payload.
	fn fetch_report<'a>(
		&'a self,
		session: &'a SessionContext,
		kind: CheckKind,
	) -> ApiFuture<'a, ComplianceReport>;

	/// Enables RLS on every table; resolves once the API reports `success: true`.
	fn fix_rls<'a>(&'a self, session: &'a SessionContext) -> ApiFuture<'a, ()>;
}

#[derive(Deserialize)]
struct FixResponse {
	success: bool,
}

/// [`ComplianceApi`] over HTTP with bearer authentication.
///
/// Endpoint paths are absolute, so any path on `base` is replaced.
pub struct HttpComplianceApi<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	base: Url,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> HttpComplianceApi<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client rooted at `base`.
	pub fn with_http_client(
		base: Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { base, http_client: http_client.into(), transport_mapper: mapper.into() }
	}

	/// Base URL of the compliance API.
	pub fn base(&self) -> &Url {
		&self.base
	}

	async fn call<T>(
		&self,
		session: &SessionContext,
		method: Method,
		path: &'static str,
		endpoint: &'static str,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let token = session.ensure_active(OffsetDateTime::now_utc())?;
		let url = self
			.base
			.join(path)
			.map_err(|source| ConfigError::InvalidUrl { what: "compliance API", source })?;
		let request = oauth2::http::Request::builder()
			.method(method)
			.uri(url.as_str())
			.header(AUTHORIZATION, token.bearer())
			.header(CONTENT_TYPE, "application/json")
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let response = oauth::dispatch(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			CallTarget::ComplianceApi,
			request,
		)
		.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(UpstreamError::ComplianceApi { status: status.as_u16() }.into());
		}

		let mut de = serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| UpstreamError::ComplianceResponseParse { endpoint, source }.into())
	}
}
impl HttpComplianceApi {
	/// Creates a reqwest-backed client honoring `timeout`.
	pub fn new(base: Url, timeout: Option<std::time::Duration>) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			base,
			ReqwestHttpClient::with_timeout(timeout)?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> ComplianceApi for HttpComplianceApi<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fetch_report<'a>(
		&'a self,
		session: &'a SessionContext,
		kind: CheckKind,
	) -> ApiFuture<'a, ComplianceReport> {
		Box::pin(async move {
			let payload: JsonValue =
				self.call(session, Method::GET, kind.endpoint_path(), kind.endpoint()).await?;

			Ok(ComplianceReport::new(payload))
		})
	}

	fn fix_rls<'a>(&'a self, session: &'a SessionContext) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			let response: FixResponse =
				self.call(session, Method::POST, FIX_RLS_PATH, "fix-rls").await?;

			if response.success { Ok(()) } else { Err(UpstreamError::RemediationRejected.into()) }
		})
	}
}
impl<C, M> Debug for HttpComplianceApi<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpComplianceApi").field("base", &self.base.as_str()).finish()
	}
}
