//! Authentication flows: the in-process token exchange, the remote exchanger that talks to a
//! running broker, and the redirect bootstrap that ties them to client-side storage.

pub mod bootstrap;
pub mod remote;

mod token_exchange;

pub use bootstrap::*;
pub use remote::*;
pub use token_exchange::*;

// crates.io
use oauth2::ClientSecret;
// self
use crate::{
	_prelude::*,
	http::{BrokerHttpClient, ReqwestHttpClient},
	oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
	provider::ProviderDescriptor,
	session::SessionContext,
};

/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Boxed future returned by [`TokenExchanger`] implementations.
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<SessionContext>> + 'a + Send>>;

/// Turns an authorization code plus client identifier into a session.
pub trait TokenExchanger
where
	Self: Send + Sync,
{
	/// Exchanges `code` issued to `client_id`.
	fn exchange<'a>(&'a self, code: &'a str, client_id: &'a str) -> ExchangeFuture<'a>;
}

/// Performs the authorization-code exchange against a single provider descriptor.
///
/// The broker owns the HTTP client, the transport error mapper, the descriptor, and the
/// server-side client secret. The secret is optional so a misconfigured deployment still
/// answers requests (with a configuration error) instead of refusing to start.
#[derive(Clone)]
pub struct Broker<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Provider descriptor that defines endpoints and client authentication.
	pub descriptor: ProviderDescriptor,
	/// Client secret used at the token endpoint.
	pub client_secret: Option<ClientSecret>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			client_secret: None,
		}
	}

	/// Sets or replaces the client secret; an empty value counts as unset.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		let secret = secret.into();

		self.client_secret = (!secret.is_empty()).then(|| ClientSecret::new(secret));

		self
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}
