// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper for upstream search credentials.
//!
//! Credential API keys travel through logs, health payloads and the
//! management API. [`Secret<T>`] makes every one of those render as
//! [`REDACTED`]; the only way to read the value is an explicit
//! [`Secret::expose`] call at the point where the key goes on the wire.
//!
//! ```
//! use trawl_common_secret::SecretString;
//!
//! let key = SecretString::new("AIzaSy-example".to_string());
//! assert_eq!(format!("{key}"), "[REDACTED]");
//! assert_eq!(key.expose(), "AIzaSy-example");
//! ```

use std::fmt;
use zeroize::Zeroize;

/// Placeholder printed in place of any secret value.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must never be printed or serialized in the clear.
///
/// Zeroized on drop. There is no `Deref`; use [`Secret::expose`].
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Secret strings are the only kind the credential store needs.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Keep call sites few and obvious.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl SecretString {
	/// Short, non-reversible hint for operators: the last four characters.
	///
	/// Keys shorter than eight characters yield no hint at all.
	pub fn hint(&self) -> Option<String> {
		let chars: Vec<char> = self.inner.chars().collect();
		if chars.len() < 8 {
			return None;
		}
		let tail: String = chars[chars.len() - 4..].iter().collect();
		Some(format!("…{tail}"))
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self::new(self.inner.clone())
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Zeroize + Deserialize<'de>,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_is_redacted() {
		let secret = SecretString::new("AIzaSy-live-key".to_string());
		assert_eq!(format!("{secret:?}"), "Secret(\"[REDACTED]\")");
	}

	#[test]
	fn display_is_redacted() {
		let secret = SecretString::new("AIzaSy-live-key".to_string());
		assert_eq!(secret.to_string(), REDACTED);
	}

	#[test]
	fn expose_returns_inner_value() {
		let secret = SecretString::new("AIzaSy-live-key".to_string());
		assert_eq!(secret.expose(), "AIzaSy-live-key");
	}

	#[test]
	fn hint_shows_last_four() {
		let secret = SecretString::new("AIzaSyAbCdEf1234".to_string());
		assert_eq!(secret.hint().as_deref(), Some("…1234"));
	}

	#[test]
	fn hint_withheld_for_short_keys() {
		assert!(SecretString::new("abc".to_string()).hint().is_none());
	}

	#[test]
	fn serialize_is_redacted() {
		let secret = SecretString::new("AIzaSy-live-key".to_string());
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, "\"[REDACTED]\"");
	}

	#[test]
	fn deserialize_populates_secret() {
		let secret: SecretString = serde_json::from_str("\"AIzaSy-live-key\"").unwrap();
		assert_eq!(secret.expose(), "AIzaSy-live-key");
	}

	proptest! {
		#[test]
		fn debug_never_contains_secret(inner in "[a-zA-Z0-9_-]{5,40}") {
			let secret = SecretString::new(inner.clone());
			let debug = format!("{:?}", secret);
			prop_assert!(!debug.contains(&inner));
		}

		#[test]
		fn clone_preserves_value(inner in ".*") {
			let secret = SecretString::new(inner.clone());
			let cloned = secret.clone();
			prop_assert_eq!(cloned.expose(), &inner);
		}
	}
}
