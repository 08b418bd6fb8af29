//! Minimal cookie codec for the two session cookies.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
// self
use crate::_prelude::*;

/// Script-readable cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "supabase_access_token";
/// `HttpOnly` cookie carrying the client identifier.
pub const CLIENT_ID_COOKIE: &str = "supabase_client_id";

// Characters `encodeURIComponent` leaves untouched.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
	.remove(b'-')
	.remove(b'_')
	.remove(b'.')
	.remove(b'!')
	.remove(b'~')
	.remove(b'*')
	.remove(b'\'')
	.remove(b'(')
	.remove(b')');

/// Cookie as written in a `Set-Cookie` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
	/// Cookie name.
	pub name: String,
	/// Decoded cookie value.
	pub value: String,
	/// `Path` attribute.
	pub path: String,
	/// `Max-Age` attribute in seconds.
	pub max_age: Option<i64>,
	/// `HttpOnly` attribute.
	pub http_only: bool,
	/// `Secure` attribute.
	pub secure: bool,
}
impl SessionCookie {
	/// Serializes the cookie into a `Set-Cookie` header value.
	pub fn to_header_value(&self) -> String {
		let mut out = format!("{}={}; Path={}", self.name, encode_value(&self.value), self.path);

		if let Some(max_age) = self.max_age {
			out.push_str(&format!("; Max-Age={max_age}"));
		}
		if self.http_only {
			out.push_str("; HttpOnly");
		}
		if self.secure {
			out.push_str("; Secure");
		}

		out
	}

	/// Parses a `Set-Cookie` header value; unknown attributes are ignored.
	pub fn parse_set_cookie(header: &str) -> Option<Self> {
		let mut parts = header.split(';').map(str::trim);
		let (name, value) = parts.next()?.split_once('=')?;

		if name.is_empty() {
			return None;
		}

		let mut cookie = Self {
			name: name.to_owned(),
			value: decode_value(value),
			path: "/".into(),
			max_age: None,
			http_only: false,
			secure: false,
		};

		for attr in parts {
			let (key, val) = attr.split_once('=').unwrap_or((attr, ""));

			match key.to_ascii_lowercase().as_str() {
				"path" => cookie.path = val.to_owned(),
				"max-age" => cookie.max_age = val.parse().ok(),
				"httponly" => cookie.http_only = true,
				"secure" => cookie.secure = true,
				_ => {},
			}
		}

		Some(cookie)
	}
}

/// Name/value pairs from a `Cookie` request header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieJar(BTreeMap<String, String>);
impl CookieJar {
	/// Parses `name=value; other=value` pairs; malformed segments are skipped.
	pub fn parse_header(header: &str) -> Self {
		let mut jar = Self::default();

		for pair in header.split(';').map(str::trim) {
			if let Some((name, value)) = pair.split_once('=')
				&& !name.is_empty()
			{
				jar.insert(name, decode_value(value));
			}
		}

		jar
	}

	/// Stores a decoded value under `name`.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.0.insert(name.into(), value.into());
	}

	/// Returns the decoded value for `name`, if present and non-empty.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(name).map(String::as_str).filter(|value| !value.is_empty())
	}

	/// Removes `name` from the jar.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.remove(name)
	}
}

fn encode_value(value: &str) -> String {
	utf8_percent_encode(value, COOKIE_VALUE).to_string()
}

fn decode_value(value: &str) -> String {
	percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_cookie_parse_reads_attributes() {
		let cookie = SessionCookie::parse_set_cookie(
			"supabase_access_token=abc; Path=/; Max-Age=3600; HttpOnly; Secure; SameSite=lax",
		)
		.expect("Set-Cookie header should parse.");

		assert_eq!(cookie.name, ACCESS_TOKEN_COOKIE);
		assert_eq!(cookie.value, "abc");
		assert_eq!(cookie.max_age, Some(3600));
		assert!(cookie.http_only);
		assert!(cookie.secure);
		assert!(SessionCookie::parse_set_cookie("garbage").is_none());
	}

	#[test]
	fn values_with_reserved_characters_survive_encoding() {
		let cookie = SessionCookie {
			name: ACCESS_TOKEN_COOKIE.into(),
			value: "a b;c=d&e".into(),
			path: "/".into(),
			max_age: Some(60),
			http_only: false,
			secure: false,
		};
		let header = cookie.to_header_value();

		assert!(header.starts_with("supabase_access_token=a%20b%3Bc%3Dd%26e;"));
		assert_eq!(SessionCookie::parse_set_cookie(&header), Some(cookie));
	}

	#[test]
	fn plus_signs_are_kept_literally() {
		let jar = CookieJar::parse_header("supabase_access_token=ab+cd/ef==");

		assert_eq!(jar.get(ACCESS_TOKEN_COOKIE), Some("ab+cd/ef=="));

		let cookie = SessionCookie {
			name: ACCESS_TOKEN_COOKIE.into(),
			value: "ab+cd/ef==".into(),
			path: "/".into(),
			max_age: None,
			http_only: false,
			secure: false,
		};
		let header = cookie.to_header_value();

		assert_eq!(header, "supabase_access_token=ab%2Bcd%2Fef%3D%3D; Path=/");
		assert_eq!(
			SessionCookie::parse_set_cookie(&header).map(|parsed| parsed.value),
			Some("ab+cd/ef==".into())
		);
	}

	#[test]
	fn jar_parses_request_header_and_ignores_empty_values() {
		let jar = CookieJar::parse_header("supabase_access_token=tok==; theme=dark; broken; x=");

		assert_eq!(jar.get(ACCESS_TOKEN_COOKIE), Some("tok=="));
		assert_eq!(jar.get("theme"), Some("dark"));
		assert_eq!(jar.get("x"), None);
		assert_eq!(jar.get("broken"), None);
	}
}
