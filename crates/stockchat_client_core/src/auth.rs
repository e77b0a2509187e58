use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use stockchat_domain::UserProfile;

/// Token wrapper that never prints its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
	pub fn new(s: impl Into<String>) -> Self {
		Self(s.into())
	}

	/// Access the inner secret string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString(<redacted>)")
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("<redacted>")
	}
}

impl<'de> serde::Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Ok(SecretString::new(s))
	}
}

/// Source of the current identity and bearer token.
///
/// Read at the moment of each request or connect; implementations must not
/// expect callers to cache the values.
pub trait AuthProvider: Send + Sync {
	fn access_token(&self) -> Option<SecretString>;
	fn current_user(&self) -> Option<UserProfile>;
}

#[derive(Debug, Default)]
struct AuthState {
	token: Option<SecretString>,
	profile: Option<UserProfile>,
}

/// Process-wide auth store, shared by the API client and the room controller.
#[derive(Debug, Clone, Default)]
pub struct SharedAuth {
	inner: Arc<RwLock<AuthState>>,
}

impl SharedAuth {
	pub fn new(token: Option<SecretString>) -> Self {
		Self {
			inner: Arc::new(RwLock::new(AuthState { token, profile: None })),
		}
	}

	pub fn set_token(&self, token: Option<SecretString>) {
		self.inner.write().token = token.filter(|t| !t.expose().trim().is_empty());
	}

	pub fn set_profile(&self, profile: Option<UserProfile>) {
		self.inner.write().profile = profile;
	}

	/// Drop both token and profile.
	pub fn clear(&self) {
		let mut g = self.inner.write();
		g.token = None;
		g.profile = None;
	}
}

impl AuthProvider for SharedAuth {
	fn access_token(&self) -> Option<SecretString> {
		self.inner.read().token.clone()
	}

	fn current_user(&self) -> Option<UserProfile> {
		self.inner.read().profile.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn secret_is_redacted() {
		let s = SecretString::new("abc");
		assert_eq!(format!("{s}"), "<redacted>");
		assert_eq!(format!("{s:?}"), "SecretString(<redacted>)");
		assert_eq!(s.expose(), "abc");
	}

	#[test]
	fn token_updates_are_visible_to_clones() {
		let auth = SharedAuth::new(None);
		let reader = auth.clone();
		assert!(reader.access_token().is_none());

		auth.set_token(Some(SecretString::new("t1")));
		assert_eq!(reader.access_token().map(|t| t.expose().to_string()).as_deref(), Some("t1"));

		auth.set_token(Some(SecretString::new("  ")));
		assert!(reader.access_token().is_none());

		auth.set_profile(Some(UserProfile {
			id: 1,
			username: "a".into(),
			nickname: None,
			bonus_points: Some(5),
		}));
		assert_eq!(reader.current_user().map(|u| u.id), Some(1));
		auth.clear();
		assert!(reader.current_user().is_none());
	}
}
