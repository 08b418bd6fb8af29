//! Provider descriptor data structures and helpers shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ProviderId};

/// Supabase Management API authorize endpoint.
pub const SUPABASE_AUTHORIZE_URL: &str = "https://api.supabase.com/v1/oauth/authorize";
/// Supabase Management API token endpoint.
pub const SUPABASE_TOKEN_URL: &str = "https://api.supabase.com/v1/oauth/token";
/// Redirect URI registered for the dashboard.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000";

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// `client_id`/`client_secret` as query parameters of the token URL.
	ClientSecretQuery,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Redirect URI sent verbatim on both the authorize redirect and the token exchange.
	pub redirect_uri: String,
	/// Client authentication mechanism used at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Descriptor for the Supabase Management API with the default redirect URI.
	pub fn supabase() -> Result<Self, ProviderDescriptorError> {
		let id = ProviderId::new("supabase").map_err(|_| ProviderDescriptorError::InvalidId)?;

		Self::builder(id)
			.authorization_endpoint(parse_url("authorization", SUPABASE_AUTHORIZE_URL)?)
			.token_endpoint(parse_url("token", SUPABASE_TOKEN_URL)?)
			.client_auth_method(ClientAuthMethod::ClientSecretQuery)
			.build()
	}

	/// Builds the authorize URL for `client_id`, optionally carrying a `state` value.
	pub fn authorize_url(&self, client_id: &str, state: Option<&str>) -> Url {
		let mut url = self.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("client_id", client_id);
		pairs.append_pair("redirect_uri", &self.redirect_uri);
		pairs.append_pair("response_type", "code");

		if let Some(state) = state {
			pairs.append_pair("state", state);
		}

		drop(pairs);

		url
	}
}

fn parse_url(endpoint: &'static str, raw: &str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|source| ProviderDescriptorError::InvalidUrl { endpoint, source })
}
