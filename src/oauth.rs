//! Token-endpoint facade plus the shared request dispatcher used by every outbound call.

pub use oauth2;

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient, AuthorizationCode, ClientSecret, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::{ConfigError, TransportError, UpstreamError},
	http::{BrokerHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ClientAuthMethod, ProviderDescriptor},
	session::SessionCredential,
};

type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Remote endpoint family targeted by an outbound call; used to label transport errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallTarget {
	/// Provider OAuth token endpoint.
	TokenEndpoint,
	/// The broker's own `POST /api/auth/token` endpoint.
	ExchangeEndpoint,
	/// External compliance API.
	ComplianceApi,
}
impl CallTarget {
	/// Returns a stable label suitable for log fields and error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallTarget::TokenEndpoint => "token endpoint",
			CallTarget::ExchangeEndpoint => "token exchange endpoint",
			CallTarget::ComplianceApi => "compliance API",
		}
	}
}
impl Display for CallTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	fn map_transport_error(
		&self,
		target: CallTarget,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		target: CallTarget,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(target, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(target, meta, message),
			_ => map_generic_transport_error(target, meta, "unrecognized client failure"),
		}
	}
}

/// Sends `request` through a fresh instrumented handle and returns the raw response.
///
/// Non-success statuses are returned as responses; only transport failures become errors.
pub(crate) async fn dispatch<C, M>(
	http_client: &C,
	mapper: &M,
	target: CallTarget,
	request: HttpRequest,
) -> Result<HttpResponse>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let slot = ResponseMetadataSlot::default();
	let handle = http_client.with_metadata(slot.clone());
	let response = handle
		.call(request)
		.await
		.map_err(|err| mapper.map_transport_error(target, slot.take().as_ref(), err))?;

	#[cfg(feature = "tracing")]
	{
		let meta = slot.take().unwrap_or_default();

		tracing::debug!(
			target_endpoint = target.as_str(),
			status = response.status().as_u16(),
			elapsed_ms = meta.elapsed.map(|elapsed| elapsed.as_millis() as u64),
			"Outbound call completed."
		);
	}

	Ok(response)
}

/// Decodes an error body for passthrough: JSON when possible, otherwise the raw text.
pub(crate) fn passthrough_details(body: &[u8]) -> JsonValue {
	serde_json::from_slice(body)
		.unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(body).into_owned()))
}

/// Authorization-code exchange against a provider token endpoint.
pub(crate) struct TokenEndpointFacade<'a, C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: &'a ProviderDescriptor,
	http_client: &'a C,
	error_mapper: &'a M,
}
impl<'a, C, M> TokenEndpointFacade<'a, C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		descriptor: &'a ProviderDescriptor,
		http_client: &'a C,
		error_mapper: &'a M,
	) -> Self {
		Self { descriptor, http_client, error_mapper }
	}

	pub(crate) fn exchange_authorization_code<'b>(
		&'b self,
		client_id: &'b ClientId,
		client_secret: &'b ClientSecret,
		code: &'b AuthorizationCode,
	) -> FacadeFuture<'b, SessionCredential>
	where
		'a: 'b,
	{
		Box::pin(async move {
			let request = build_token_request(self.descriptor, client_id, client_secret, code)?;
			let response =
				dispatch(self.http_client, self.error_mapper, CallTarget::TokenEndpoint, request)
					.await?;

			map_token_response(client_id, response)
		})
	}
}

/// Builds `grant_type=authorization_code` with the descriptor's client authentication method.
pub(crate) fn build_token_request(
	descriptor: &ProviderDescriptor,
	client_id: &ClientId,
	client_secret: &ClientSecret,
	code: &AuthorizationCode,
) -> Result<HttpRequest> {
	let mut url = descriptor.endpoints.token.clone();
	let mut form = form_urlencoded::Serializer::new(String::new());
	let mut builder = oauth2::http::Request::builder()
		.method(Method::POST)
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json");

	form.append_pair("grant_type", "authorization_code");
	form.append_pair("code", code.secret());
	form.append_pair("redirect_uri", &descriptor.redirect_uri);

	match descriptor.client_auth_method {
		ClientAuthMethod::ClientSecretQuery => {
			url.query_pairs_mut()
				.append_pair("client_id", client_id)
				.append_pair("client_secret", client_secret.secret());
		},
		ClientAuthMethod::ClientSecretPost => {
			form.append_pair("client_id", client_id);
			form.append_pair("client_secret", client_secret.secret());
		},
		ClientAuthMethod::ClientSecretBasic => {
			let credentials = format!(
				"{}:{}",
				form_urlencoded::byte_serialize(client_id.as_bytes()).collect::<String>(),
				form_urlencoded::byte_serialize(client_secret.secret().as_bytes())
					.collect::<String>(),
			);

			builder =
				builder.header(AUTHORIZATION, format!("Basic {}", STANDARD.encode(credentials)));
		},
	}

	builder
		.uri(url.as_str())
		.body(form.finish().into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}

fn map_token_response(client_id: &ClientId, response: HttpResponse) -> Result<SessionCredential> {
	let status = response.status();

	if !status.is_success() {
		return Err(UpstreamError::TokenEndpoint {
			status: status.as_u16(),
			details: passthrough_details(response.body()),
		}
		.into());
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let parsed: TokenEndpointResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| UpstreamError::TokenResponseParse { source })?;
	let expires_in =
		parsed.expires_in.filter(|secs| *secs > 0).ok_or(UpstreamError::InvalidExpiresIn)?;

	Ok(SessionCredential::new(
		TokenSecret::new(parsed.access_token),
		client_id.clone(),
		OffsetDateTime::now_utc(),
		Duration::seconds(expires_in),
	))
}

fn map_reqwest_error(target: CallTarget, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { target: target.as_str() }.into();
	}

	TransportError::network(target.as_str(), err).into()
}

fn map_generic_transport_error(
	target: CallTarget,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	let message = match meta.and_then(|value| value.status) {
		Some(status) => format!("{message} (HTTP {status})"),
		None => message.to_string(),
	};

	TransportError::Other { target: target.as_str(), message }.into()
}
