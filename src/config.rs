//! Runtime configuration shared by the server and the CLI.

// std
use std::net::{Ipv4Addr, SocketAddr};
// self
use crate::{
	_prelude::*,
	compliance::HttpComplianceApi,
	error::ConfigError,
	flows::{Broker, ReqwestBroker},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::ProviderDescriptor,
};

/// Default compliance API base URL.
pub const DEFAULT_COMPLIANCE_API_URL: &str = "http://localhost:3001";
/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Deployment environment; production turns on `Secure` cookies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	#[default]
	/// Local development.
	Development,
	/// Production deployment.
	Production,
}
impl Environment {
	/// Returns a stable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Development => "development",
			Environment::Production => "production",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = UnknownEnvironment;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"production" | "prod" => Ok(Self::Production),
			_ => Err(UnknownEnvironment(s.to_owned())),
		}
	}
}

/// Error returned when parsing an unknown environment label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown environment `{0}`; expected development or production.")]
pub struct UnknownEnvironment(pub String);

/// Broker configuration.
#[derive(Clone)]
pub struct AppConfig {
	/// Provider client secret; absence only fails the token exchange itself.
	pub client_secret: Option<String>,
	/// Deployment environment.
	pub environment: Environment,
	/// Address the HTTP server listens on.
	pub bind_addr: SocketAddr,
	/// Base URL of the compliance API.
	pub compliance_api_base: Url,
	/// Per-request timeout; `None` disables it.
	pub request_timeout: Option<std::time::Duration>,
	/// Provider descriptor used for the authorize redirect and token exchange.
	pub descriptor: ProviderDescriptor,
}
impl AppConfig {
	/// Defaults: Supabase descriptor, development, `127.0.0.1:3000`, 30 second timeout.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self {
			client_secret: None,
			environment: Environment::Development,
			bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
			compliance_api_base: Url::parse(DEFAULT_COMPLIANCE_API_URL)
				.map_err(|source| ConfigError::InvalidUrl { what: "compliance API", source })?,
			request_timeout: timeout_from_secs(DEFAULT_TIMEOUT_SECS),
			descriptor: ProviderDescriptor::supabase()?,
		})
	}

	/// Sets the client secret; an empty value counts as unset.
	pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
		self.client_secret = secret.filter(|secret| !secret.is_empty());

		self
	}

	/// Whether cookies carry the `Secure` attribute.
	pub fn secure_cookies(&self) -> bool {
		self.environment == Environment::Production
	}

	/// Builds the reqwest-backed broker for this configuration.
	pub fn build_broker(&self) -> Result<ReqwestBroker, ConfigError> {
		let broker = Broker::with_http_client(
			self.descriptor.clone(),
			ReqwestHttpClient::with_timeout(self.request_timeout)?,
			ReqwestTransportErrorMapper,
		);

		Ok(match &self.client_secret {
			Some(secret) => broker.with_client_secret(secret.as_str()),
			None => broker,
		})
	}

	/// Builds the reqwest-backed compliance API client for this configuration.
	pub fn build_compliance_api(&self) -> Result<HttpComplianceApi, ConfigError> {
		HttpComplianceApi::new(self.compliance_api_base.clone(), self.request_timeout)
	}
}
impl Debug for AppConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppConfig")
			.field("client_secret_set", &self.client_secret.is_some())
			.field("environment", &self.environment)
			.field("bind_addr", &self.bind_addr)
			.field("compliance_api_base", &self.compliance_api_base.as_str())
			.field("request_timeout", &self.request_timeout)
			.field("descriptor", &self.descriptor.id)
			.finish()
	}
}

/// Converts a timeout in seconds; `0` disables the timeout.
pub fn timeout_from_secs(secs: u64) -> Option<std::time::Duration> {
	(secs > 0).then(|| std::time::Duration::from_secs(secs))
}
