//! Explicit session context passed to every authenticated call.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::UpstreamError,
	session::{
		ACCESS_TOKEN_COOKIE, ClientStorage, CookieJar, SessionCookie, SessionCredential,
		StorageError,
	},
};

const EXPIRES_AT_KEY: &str = "supabase_access_token_expires_at";

/// Bearer token plus its expiry instant, when known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
	access_token: TokenSecret,
	expires_at: Option<OffsetDateTime>,
}
impl SessionContext {
	/// Creates a context from raw parts.
	pub fn new(access_token: TokenSecret, expires_at: Option<OffsetDateTime>) -> Self {
		Self { access_token, expires_at }
	}

	/// Server-side acquisition straight from the exchange result.
	pub fn from_credential(credential: &SessionCredential) -> Self {
		Self::new(credential.access_token.clone(), Some(credential.expires_at()))
	}

	/// Acquires the context from a request cookie jar.
	///
	/// Browsers drop expired cookies, so the jar carries no expiry instant.
	pub fn from_cookie_jar(jar: &CookieJar) -> Option<Self> {
		jar.get(ACCESS_TOKEN_COOKIE).map(|token| Self::new(TokenSecret::new(token), None))
	}

	/// Acquires the context from the `Set-Cookie` headers of a token-exchange response.
	///
	/// `Max-Age` is resolved against `now`; a non-positive value deletes the cookie.
	pub fn from_set_cookie_headers<'a, I>(headers: I, now: OffsetDateTime) -> Result<Self>
	where
		I: IntoIterator<Item = &'a str>,
	{
		headers
			.into_iter()
			.filter_map(SessionCookie::parse_set_cookie)
			.filter(|cookie| cookie.name == ACCESS_TOKEN_COOKIE && !cookie.value.is_empty())
			.find(|cookie| cookie.max_age.is_none_or(|secs| secs > 0))
			.map(|cookie| {
				let expires_at = cookie.max_age.map(|secs| now + Duration::seconds(secs));

				Self::new(TokenSecret::new(cookie.value), expires_at)
			})
			.ok_or_else(|| UpstreamError::MissingSessionCookie.into())
	}

	/// Bearer token carried by the session.
	pub fn access_token(&self) -> &TokenSecret {
		&self.access_token
	}

	/// Expiry instant, when known.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns the token while the session is active, or [`Error::SessionExpired`].
	pub fn ensure_active(&self, now: OffsetDateTime) -> Result<&TokenSecret> {
		match self.expires_at {
			Some(expired_at) if now >= expired_at => Err(Error::SessionExpired { expired_at }),
			_ => Ok(&self.access_token),
		}
	}

	/// Writes the token (and expiry) to client storage.
	pub fn persist(&self, storage: &dyn ClientStorage) -> Result<(), StorageError> {
		storage.set(ACCESS_TOKEN_COOKIE, self.access_token.expose())?;

		match self.expires_at {
			Some(instant) => {
				let formatted =
					instant.format(&Rfc3339).map_err(|e| StorageError::Serialization {
						message: format!("Failed to format session expiry: {e}"),
					})?;

				storage.set(EXPIRES_AT_KEY, &formatted)
			},
			None => storage.remove(EXPIRES_AT_KEY),
		}
	}

	/// Reads a previously persisted context, if any.
	pub fn restore(storage: &dyn ClientStorage) -> Result<Option<Self>, StorageError> {
		let Some(token) = storage.get(ACCESS_TOKEN_COOKIE)?.filter(|token| !token.is_empty())
		else {
			return Ok(None);
		};
		let expires_at = storage
			.get(EXPIRES_AT_KEY)?
			.map(|raw| {
				OffsetDateTime::parse(&raw, &Rfc3339).map_err(|e| StorageError::Serialization {
					message: format!("Failed to parse session expiry: {e}"),
				})
			})
			.transpose()?;

		Ok(Some(Self::new(TokenSecret::new(token), expires_at)))
	}

	/// Removes any persisted context.
	pub fn clear(storage: &dyn ClientStorage) -> Result<(), StorageError> {
		storage.remove(ACCESS_TOKEN_COOKIE)?;
		storage.remove(EXPIRES_AT_KEY)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::session::MemoryStorage;

	#[test]
	fn ensure_active_fails_once_expiry_passes() {
		let expires_at = datetime!(2025-01-01 01:00 UTC);
		let context = SessionContext::new(TokenSecret::new("abc"), Some(expires_at));

		assert_eq!(
			context
				.ensure_active(datetime!(2025-01-01 00:30 UTC))
				.expect("Active session should yield its token.")
				.expose(),
			"abc"
		);
		assert!(matches!(
			context.ensure_active(expires_at),
			Err(Error::SessionExpired { expired_at }) if expired_at == expires_at
		));

		let unbounded = SessionContext::new(TokenSecret::new("abc"), None);

		assert!(unbounded.ensure_active(datetime!(2100-01-01 00:00 UTC)).is_ok());
	}

	#[test]
	fn set_cookie_headers_yield_token_and_expiry() {
		let now = datetime!(2025-01-01 00:00 UTC);
		let context = SessionContext::from_set_cookie_headers(
			[
				"supabase_client_id=client-1; Path=/; Max-Age=3600; HttpOnly",
				"supabase_access_token=abc; Path=/; Max-Age=3600",
			],
			now,
		)
		.expect("Access-token cookie should be found.");

		assert_eq!(context.access_token().expose(), "abc");
		assert_eq!(context.expires_at(), Some(datetime!(2025-01-01 01:00 UTC)));

		let err = SessionContext::from_set_cookie_headers(["supabase_client_id=x"], now)
			.expect_err("Missing access-token cookie should fail.");

		assert!(matches!(err, Error::Upstream(UpstreamError::MissingSessionCookie)));
	}

	#[test]
	fn cookie_jar_acquisition_requires_a_non_empty_token() {
		assert!(SessionContext::from_cookie_jar(&CookieJar::parse_header("theme=dark")).is_none());

		let context =
			SessionContext::from_cookie_jar(&CookieJar::parse_header("supabase_access_token=t"))
				.expect("Token cookie should yield a context.");

		assert_eq!(context.expires_at(), None);
	}

	#[test]
	fn persist_and_restore_round_trip_through_storage() {
		let storage = MemoryStorage::default();
		let context =
			SessionContext::new(TokenSecret::new("abc"), Some(datetime!(2025-01-01 01:00 UTC)));

		assert_eq!(SessionContext::restore(&storage).expect("Restore should succeed."), None);

		context.persist(&storage).expect("Persist should succeed.");

		assert_eq!(
			SessionContext::restore(&storage).expect("Restore should succeed."),
			Some(context)
		);

		SessionContext::clear(&storage).expect("Clear should succeed.");

		assert_eq!(SessionContext::restore(&storage).expect("Restore should succeed."), None);
	}
}
