//! Credential minted by a successful authorization-code exchange.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	session::{ACCESS_TOKEN_COOKIE, CLIENT_ID_COOKIE, SessionCookie},
};

/// Access token plus the client it was issued to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredential {
	/// Opaque bearer token.
	pub access_token: TokenSecret,
	/// Client identifier used for the exchange.
	pub client_id: ClientId,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Lifetime reported by the provider.
	pub expires_in: Duration,
}
impl SessionCredential {
	/// Creates a credential from the token endpoint response.
	pub fn new(
		access_token: TokenSecret,
		client_id: ClientId,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self { access_token, client_id, issued_at, expires_in }
	}

	/// Instant the token stops being valid.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + self.expires_in
	}

	/// Returns `true` once `now` reaches the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at()
	}

	/// Renders the access-token and client-id cookies.
	///
	/// The access-token cookie stays script-readable; the client-id cookie is `HttpOnly`.
	pub fn cookies(&self, secure: bool) -> [SessionCookie; 2] {
		let max_age = self.expires_in.whole_seconds();

		[
			SessionCookie {
				name: ACCESS_TOKEN_COOKIE.into(),
				value: self.access_token.expose().into(),
				path: "/".into(),
				max_age: Some(max_age),
				http_only: false,
				secure,
			},
			SessionCookie {
				name: CLIENT_ID_COOKIE.into(),
				value: self.client_id.to_string(),
				path: "/".into(),
				max_age: Some(max_age),
				http_only: true,
				secure,
			},
		]
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn credential() -> SessionCredential {
		SessionCredential::new(
			TokenSecret::new("abc"),
			ClientId::new("client-1").expect("Client fixture should be valid."),
			datetime!(2025-01-01 00:00 UTC),
			Duration::seconds(3600),
		)
	}

	#[test]
	fn expiry_is_issue_time_plus_lifetime() {
		let credential = credential();

		assert_eq!(credential.expires_at(), datetime!(2025-01-01 01:00 UTC));
		assert!(!credential.is_expired_at(datetime!(2025-01-01 00:59:59 UTC)));
		assert!(credential.is_expired_at(datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn cookies_share_max_age_and_differ_in_http_only() {
		let [access, client] = credential().cookies(false);

		assert_eq!(
			access.to_header_value(),
			"supabase_access_token=abc; Path=/; Max-Age=3600"
		);
		assert_eq!(
			client.to_header_value(),
			"supabase_client_id=client-1; Path=/; Max-Age=3600; HttpOnly"
		);

		let [access, _] = credential().cookies(true);

		assert!(access.to_header_value().ends_with("; Secure"));
	}
}
