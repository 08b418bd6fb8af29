//! Session state handed to every authenticated call.
//!
//! The token exchange yields a [`SessionCredential`], which is rendered into the two session
//! cookies. Callers rebuild a [`SessionContext`] from the credential, from a [`CookieJar`], or
//! from `Set-Cookie` headers, and pass it explicitly to the compliance poller.

pub mod context;
pub mod cookie;
pub mod credential;
pub mod storage;

pub use context::*;
pub use cookie::*;
pub use credential::*;
pub use storage::*;
