//! Broker-level error types shared across flows, transports, and the HTTP surface.
//!
//! Every failure maps onto one of five families (validation, configuration, upstream,
//! transport, internal) plus [`Error::SessionExpired`]. [`Error::status_code`] and
//! [`Error::to_body`] describe how each family is presented to HTTP clients without leaking
//! internals.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CONFIG_MESSAGE: &str = "Server configuration error";
const INTERNAL_MESSAGE: &str = "Internal server error";
const TOKEN_EXCHANGE_MESSAGE: &str = "Failed to exchange token";
const SESSION_EXPIRED_MESSAGE: &str = "Session expired";

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Caller supplied missing or malformed input.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Provider or compliance API answered with a failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Session context is past its expiry instant.
	#[error("Session expired at {expired_at}.")]
	SessionExpired {
		/// Instant the session stopped being valid.
		expired_at: OffsetDateTime,
	},
	/// Unanticipated failure; the message is logged but never sent to clients.
	#[error("Internal failure: {message}.")]
	Internal {
		/// Operator-facing description.
		message: String,
	},
}
impl Error {
	/// Wraps an unexpected failure.
	pub fn internal(message: impl Into<String>) -> Self {
		Self::Internal { message: message.into() }
	}

	/// HTTP status code used when the error is surfaced by the token endpoint.
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Validation(_) => 400,
			Self::Upstream(UpstreamError::TokenEndpoint { status, .. })
			| Self::Upstream(UpstreamError::ExchangeEndpoint { status, .. }) => *status,
			Self::SessionExpired { .. } => 401,
			Self::Config(_) | Self::Upstream(_) | Self::Transport(_) | Self::Internal { .. } =>
				500,
		}
	}

	/// JSON body describing the error; internals are replaced by generic messages.
	pub fn to_body(&self) -> ErrorBody {
		match self {
			Self::Validation(e) => ErrorBody::new(e.to_string()),
			Self::Config(_) => ErrorBody::new(CONFIG_MESSAGE),
			Self::Upstream(UpstreamError::TokenEndpoint { details, .. }) =>
				ErrorBody::new(TOKEN_EXCHANGE_MESSAGE).with_details(details.clone()),
			Self::Upstream(UpstreamError::ExchangeEndpoint { message, details, .. }) =>
				ErrorBody { error: message.clone(), details: details.clone() },
			Self::SessionExpired { .. } => ErrorBody::new(SESSION_EXPIRED_MESSAGE),
			Self::Upstream(_) | Self::Transport(_) | Self::Internal { .. } =>
				ErrorBody::new(INTERNAL_MESSAGE),
		}
	}
}

/// Structured JSON error payload returned to HTTP clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable summary.
	pub error: String,
	/// Upstream payload passed through verbatim, when safe to expose.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<JsonValue>,
}
impl ErrorBody {
	/// Creates a body without details.
	pub fn new(error: impl Into<String>) -> Self {
		Self { error: error.into(), details: None }
	}

	/// Attaches upstream details.
	pub fn with_details(mut self, details: JsonValue) -> Self {
		self.details = Some(details);

		self
	}
}

/// Input validation failures; always user-correctable.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// A required field was absent or empty.
	#[error("{field} is required")]
	MissingField {
		/// Human-readable field label (e.g. `Authorization code`).
		field: &'static str,
	},
	/// A field was present but failed validation.
	#[error("{field} is invalid: {reason}")]
	InvalidField {
		/// Human-readable field label.
		field: &'static str,
		/// Validation failure description.
		reason: String,
	},
}
impl ValidationError {
	/// Label used for the authorization code field.
	pub const AUTHORIZATION_CODE: &'static str = "Authorization code";
	/// Label used for the client identifier field.
	pub const CLIENT_ID: &'static str = "Client ID";

	/// Convenience constructor for [`ValidationError::MissingField`].
	pub const fn missing(field: &'static str) -> Self {
		Self::MissingField { field }
	}
}

/// Configuration and setup failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No client secret is configured for the token exchange.
	#[error("Client secret is not configured.")]
	MissingClientSecret,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
	/// A configured URL cannot be parsed or joined.
	#[error("Configured {what} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed.
		what: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Client-side storage could not be read or written.
	#[error(transparent)]
	Storage(#[from] crate::session::StorageError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<reqwest::Error> for ConfigError {
	fn from(e: reqwest::Error) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures reported by (or parsed from) upstream services.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Provider token endpoint rejected the exchange.
	#[error("Token endpoint rejected the exchange with HTTP {status}.")]
	TokenEndpoint {
		/// Provider HTTP status, passed through to the caller.
		status: u16,
		/// Provider error body (JSON, or the raw text as a JSON string).
		details: JsonValue,
	},
	/// Provider token endpoint answered 2xx with a body that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider token endpoint omitted `expires_in` or returned a non-positive value.
	#[error("Token endpoint returned an unusable expires_in value.")]
	InvalidExpiresIn,
	/// The broker's own token-exchange endpoint rejected the code.
	#[error("Token exchange endpoint answered HTTP {status}: {message}.")]
	ExchangeEndpoint {
		/// HTTP status returned by the exchange endpoint.
		status: u16,
		/// `error` field of the response body.
		message: String,
		/// `details` field of the response body, if any.
		details: Option<JsonValue>,
	},
	/// Exchange endpoint reported success without an access-token cookie.
	#[error("Token exchange response did not set the access token cookie.")]
	MissingSessionCookie,
	/// Compliance API answered with a non-success status.
	#[error("API error: {status}")]
	ComplianceApi {
		/// HTTP status returned by the compliance API.
		status: u16,
	},
	/// Compliance API answered 2xx with a body that could not be parsed.
	#[error("Compliance API returned malformed JSON for {endpoint}.")]
	ComplianceResponseParse {
		/// Endpoint label (`mfa-check`, `fix-rls`, ...).
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Remediation endpoint answered `{success: false}`.
	#[error("Remediation was not applied by the compliance API.")]
	RemediationRejected,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Endpoint family being called.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request to {target} timed out.")]
	Timeout {
		/// Endpoint family being called.
		target: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
	/// Transport reported an error without a structured source.
	#[error("HTTP client error occurred while calling {target}: {message}.")]
	Other {
		/// Endpoint family being called.
		target: &'static str,
		/// Transport-provided description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
