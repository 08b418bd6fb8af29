//! Provider-facing descriptors.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering the authorize and
//! token endpoints, the fixed redirect URI, the client authentication method used at the token
//! endpoint, and provider quirks (opt-in `state` parameter).

pub mod descriptor;

pub use descriptor::*;
