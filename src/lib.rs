//! OAuth 2.0 code exchange plus sequential compliance polling for backend-as-a-service
//! projects: swap an authorization code for session cookies, then audit MFA, RLS, and PITR
//! coverage through an external compliance API.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "cli")] pub mod cli;
pub mod compliance;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "server")] pub mod server;
pub mod session;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		flows::Broker, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper,
		provider::ProviderDescriptor,
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		test_reqwest_http_client_with_timeout(None)
	}

	/// Same as [`test_reqwest_http_client`], with an optional request timeout.
	pub fn test_reqwest_http_client_with_timeout(
		timeout: Option<std::time::Duration>,
	) -> ReqwestHttpClient {
		let mut builder = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none());

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		let client = builder.build().expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`Broker`] backed by the test reqwest transport, optionally carrying a
	/// client secret.
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		client_secret: Option<&str>,
	) -> ReqwestTestBroker {
		let broker = Broker::with_http_client(
			descriptor,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		);

		match client_secret {
			Some(secret) => broker.with_client_secret(secret),
			None => broker,
		}
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tokio as _};
