//! Redirect bootstrap: start the authorize redirect, then resume once the provider sends the
//! user back with a code.
//!
//! The client identifier is stashed in [`ClientStorage`] before the redirect and read back when
//! the code arrives. When the descriptor enables the `state` quirk a random value is stashed
//! alongside it and must match the one echoed on the redirect.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	error::{ConfigError, ValidationError},
	flows::TokenExchanger,
	obs::{self, FlowKind},
	provider::ProviderDescriptor,
	session::{ClientStorage, CookieJar, STASHED_CLIENT_ID_KEY, SessionContext},
};

const STATE_KEY: &str = "oauth_state";
const STATE_LEN: usize = 32;
const STATE_FIELD: &str = "State";

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthCallback {
	/// Authorization code.
	pub code: String,
	/// Echoed `state` value, when one was sent.
	pub state: Option<String>,
}
impl AuthCallback {
	/// Callback carrying only a code.
	pub fn new(code: impl Into<String>) -> Self {
		Self { code: code.into(), state: None }
	}

	/// Attaches an echoed `state` value.
	pub fn with_state(mut self, state: impl Into<String>) -> Self {
		self.state = Some(state.into());

		self
	}

	/// Extracts `code` (and `state`) from a redirect URL; `None` without a non-empty code.
	pub fn from_redirect_url(url: &Url) -> Option<Self> {
		let mut code = None;
		let mut state = None;

		for (key, value) in url.query_pairs() {
			match key.as_ref() {
				"code" => code = Some(value.into_owned()),
				"state" => state = Some(value.into_owned()),
				_ => {},
			}
		}

		code.filter(|code| !code.is_empty()).map(|code| Self { code, state })
	}
}

/// How an authenticated session was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionSource {
	/// Existing access-token cookie.
	Cookie,
	/// Fresh code exchange.
	Exchange,
}

/// Result of [`AuthBootstrap::resume`].
#[derive(Debug)]
pub enum BootstrapOutcome {
	/// A usable session exists.
	Authenticated {
		/// Session to hand to the compliance poller.
		session: SessionContext,
		/// Where the session came from.
		source: SessionSource,
	},
	/// No session and nothing to exchange; ask the user for a client identifier.
	PromptClientId,
	/// The code exchange failed and no cookie was available to fall back on.
	ExchangeFailed {
		/// Failure reported by the exchanger.
		error: Error,
	},
}

/// Drives the authorize redirect and its return leg.
#[derive(Clone)]
pub struct AuthBootstrap {
	descriptor: ProviderDescriptor,
	exchanger: Arc<dyn TokenExchanger>,
	storage: Arc<dyn ClientStorage>,
}
impl AuthBootstrap {
	/// Creates a bootstrap over the given exchanger and client storage.
	pub fn new(
		descriptor: ProviderDescriptor,
		exchanger: Arc<dyn TokenExchanger>,
		storage: Arc<dyn ClientStorage>,
	) -> Self {
		Self { descriptor, exchanger, storage }
	}

	/// Stashes the client identifier and returns the authorize URL to send the user to.
	pub fn begin_authorization(&self, client_id_input: &str) -> Result<Url> {
		begin_authorization(&self.descriptor, &*self.storage, client_id_input)
	}

	/// Resolves the current session from a pending callback or the cookie jar.
	///
	/// A callback is only exchanged when a client identifier was stashed; the stash is cleared
	/// after a successful exchange, and a failure to clear it is logged without discarding the
	/// session. A failed exchange falls back to the cookie when one exists.
	pub async fn resume(
		&self,
		jar: &CookieJar,
		callback: Option<AuthCallback>,
	) -> BootstrapOutcome {
		let from_cookie = || {
			SessionContext::from_cookie_jar(jar).map(|session| BootstrapOutcome::Authenticated {
				session,
				source: SessionSource::Cookie,
			})
		};
		let stashed = match self.storage.get(STASHED_CLIENT_ID_KEY) {
			Ok(stashed) => stashed.filter(|id| !id.is_empty()),
			Err(e) => return self.fail_or_cookie(ConfigError::from(e).into(), from_cookie()),
		};

		if let (Some(callback), Some(client_id)) = (callback, stashed) {
			let exchanged = match self.verify_state(callback.state.as_deref()) {
				Ok(()) => self.exchanger.exchange(&callback.code, &client_id).await,
				Err(e) => Err(e),
			};

			return match exchanged {
				Ok(session) => {
					if let Err(e) = self.clear_stash() {
						obs::warn_flow_failure(FlowKind::TokenExchange, "clear_stash", &e);
					}

					BootstrapOutcome::Authenticated { session, source: SessionSource::Exchange }
				},
				Err(error) => self.fail_or_cookie(error, from_cookie()),
			};
		}

		from_cookie().unwrap_or(BootstrapOutcome::PromptClientId)
	}

	fn verify_state(&self, echoed: Option<&str>) -> Result<()> {
		if !self.descriptor.quirks.state_parameter {
			return Ok(());
		}

		let expected = self.storage.get(STATE_KEY).map_err(ConfigError::from)?;

		match (expected.as_deref(), echoed) {
			(Some(expected), Some(echoed)) if expected == echoed => Ok(()),
			(_, None) => Err(ValidationError::missing(STATE_FIELD).into()),
			_ => Err(ValidationError::InvalidField {
				field: STATE_FIELD,
				reason: "does not match the value sent on the authorize redirect".into(),
			}
			.into()),
		}
	}

	fn clear_stash(&self) -> Result<()> {
		self.storage.remove(STASHED_CLIENT_ID_KEY).map_err(ConfigError::from)?;
		self.storage.remove(STATE_KEY).map_err(ConfigError::from)?;

		Ok(())
	}

	fn fail_or_cookie(&self, error: Error, cookie: Option<BootstrapOutcome>) -> BootstrapOutcome {
		obs::warn_flow_failure(FlowKind::TokenExchange, "resume", &error);

		cookie.unwrap_or(BootstrapOutcome::ExchangeFailed { error })
	}
}
impl Debug for AuthBootstrap {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthBootstrap").field("descriptor", &self.descriptor).finish()
	}
}

/// Stashes the client identifier in `storage` and returns the authorize URL.
///
/// Needs no exchanger, so the redirect can start before any broker is reachable.
pub fn begin_authorization(
	descriptor: &ProviderDescriptor,
	storage: &dyn ClientStorage,
	client_id_input: &str,
) -> Result<Url> {
	let client_id = ClientId::new(client_id_input.trim())
		.map_err(|e| e.into_validation(ValidationError::CLIENT_ID))?;
	let state = if descriptor.quirks.state_parameter {
		let state = random_string(STATE_LEN);

		storage.set(STATE_KEY, &state).map_err(ConfigError::from)?;

		Some(state)
	} else {
		None
	};

	storage.set(STASHED_CLIENT_ID_KEY, &client_id).map_err(ConfigError::from)?;

	Ok(descriptor.authorize_url(&client_id, state.as_deref()))
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
