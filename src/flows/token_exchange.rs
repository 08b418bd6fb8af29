//! Authorization-code exchange performed by the broker itself.
//!
//! [`Broker::exchange_token`] validates the request in a fixed order (code, client identifier,
//! client secret) before calling the provider, so callers always see the first missing input.

// crates.io
use oauth2::AuthorizationCode;
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	error::{ConfigError, ValidationError},
	flows::{Broker, ExchangeFuture, TokenExchanger},
	http::BrokerHttpClient,
	oauth::{TokenEndpointFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{SessionContext, SessionCredential},
};

/// JSON body accepted by `POST /api/auth/token`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
	/// Authorization code returned on the redirect.
	#[serde(default)]
	pub code: Option<String>,
	/// Client identifier the code was issued to.
	#[serde(default)]
	pub client_id: Option<String>,
}
impl TokenExchangeRequest {
	/// Creates a request with both fields present.
	pub fn new(code: impl Into<String>, client_id: impl Into<String>) -> Self {
		Self { code: Some(code.into()), client_id: Some(client_id.into()) }
	}

	fn validate(&self) -> Result<(AuthorizationCode, ClientId), ValidationError> {
		let code = self
			.code
			.as_deref()
			.filter(|code| !code.is_empty())
			.ok_or(ValidationError::missing(ValidationError::AUTHORIZATION_CODE))?;
		let client_id = ClientId::new(self.client_id.as_deref().unwrap_or_default())
			.map_err(|e| e.into_validation(ValidationError::CLIENT_ID))?;

		Ok((AuthorizationCode::new(code.to_owned()), client_id))
	}
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges the authorization code for a [`SessionCredential`].
	pub async fn exchange_token(&self, request: TokenExchangeRequest) -> Result<SessionCredential> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (code, client_id) = request.validate()?;
				let client_secret =
					self.client_secret.as_ref().ok_or(ConfigError::MissingClientSecret)?;
				let facade = TokenEndpointFacade::new(
					&self.descriptor,
					self.http_client.as_ref(),
					self.transport_mapper.as_ref(),
				);

				facade.exchange_authorization_code(&client_id, client_secret, &code).await
			})
			.await;

		obs::observe_result(KIND, "exchange_token", &result);

		result
	}
}
impl<C, M> TokenExchanger for Broker<C, M>
where
	C: ?Sized + BrokerHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange<'a>(&'a self, code: &'a str, client_id: &'a str) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let credential = self.exchange_token(TokenExchangeRequest::new(code, client_id)).await?;

			Ok(SessionContext::from_credential(&credential))
		})
	}
}
