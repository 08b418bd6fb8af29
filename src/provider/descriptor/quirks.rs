// self
use crate::_prelude::*;

/// Provider-specific quirks that influence how flows behave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Appends a random `state` value to the authorize URL and requires it on the redirect.
	///
	/// Disabled by default so the authorize URL carries exactly `client_id`, `redirect_uri`,
	/// and `response_type`.
	pub state_parameter: bool,
}
