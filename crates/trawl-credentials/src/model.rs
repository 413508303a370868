// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime and on-disk credential shapes.
//!
//! [`Credential`] keeps its key in a [`SecretString`]. [`PersistedCredential`]
//! is the plain form written to disk and must never be logged.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trawl_common_secret::SecretString;

/// Opaque credential identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CredentialId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CredentialId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
	pub id: CredentialId,
	pub api_key: SecretString,
	pub cx: String,
	pub quota: u32,
	pub last_reset: DateTime<Utc>,
}

impl Credential {
	pub fn is_active(&self) -> bool {
		self.quota > 0
	}

	pub(crate) fn apply(&mut self, patch: CredentialPatch) {
		if let Some(api_key) = patch.api_key {
			self.api_key = api_key;
		}
		if let Some(cx) = patch.cx {
			self.cx = cx;
		}
		if let Some(quota) = patch.quota {
			self.quota = clamp_quota(quota);
		}
		if let Some(last_reset) = patch.last_reset {
			self.last_reset = last_reset;
		}
	}
}

/// Input for creating a credential with the store's default quota.
#[derive(Debug, Clone)]
pub struct NewCredential {
	pub api_key: SecretString,
	pub cx: String,
}

impl NewCredential {
	pub fn new(api_key: impl Into<String>, cx: impl Into<String>) -> Self {
		Self {
			api_key: SecretString::new(api_key.into()),
			cx: cx.into(),
		}
	}
}

/// Partial update. `quota` is signed so callers can pass through
/// whatever arithmetic they did; negatives land as zero.
#[derive(Debug, Clone, Default)]
pub struct CredentialPatch {
	pub api_key: Option<SecretString>,
	pub cx: Option<String>,
	pub quota: Option<i64>,
	pub last_reset: Option<DateTime<Utc>>,
}

impl CredentialPatch {
	pub fn quota(quota: i64) -> Self {
		Self {
			quota: Some(quota),
			..Self::default()
		}
	}

	pub fn reset(quota: u32, at: DateTime<Utc>) -> Self {
		Self {
			quota: Some(i64::from(quota)),
			last_reset: Some(at),
			..Self::default()
		}
	}
}

/// Result of an atomic quota reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
	/// One unit was taken; `remaining` is what is left after it.
	Consumed { remaining: u32 },
	/// Quota was already zero; nothing changed.
	Exhausted,
	/// The credential was deleted.
	Missing,
}

pub(crate) fn clamp_quota(quota: i64) -> u32 {
	quota.clamp(0, i64::from(u32::MAX)) as u32
}

/// On-disk document.
///
/// Reads either `{"credentials": [..]}` or the older
/// `{"collections": {"apikeys": {<id>: {..}}}}` layout, where the map key
/// is the id and map order is pool order. Anything else is rejected so a
/// foreign file is never silently replaced by an empty pool. Always
/// written back in the `credentials` layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDocument")]
pub struct PersistedDocument {
	pub credentials: Vec<PersistedCredential>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
	credentials: Option<Vec<PersistedCredential>>,
	collections: Option<LegacyCollections>,
}

impl TryFrom<RawDocument> for PersistedDocument {
	type Error = String;

	fn try_from(raw: RawDocument) -> std::result::Result<Self, Self::Error> {
		match (raw.credentials, raw.collections) {
			(Some(_), Some(_)) => Err("document has both `credentials` and `collections`".into()),
			(Some(credentials), None) => Ok(Self { credentials }),
			(None, Some(collections)) => Ok(Self {
				credentials: collections.apikeys.0,
			}),
			(None, None) => Ok(Self::default()),
		}
	}
}

#[derive(Deserialize)]
struct LegacyCollections {
	#[serde(default)]
	apikeys: LegacyApikeys,
}

#[derive(Deserialize)]
struct LegacyEntry {
	apikey: String,
	cx: String,
	#[serde(default)]
	quotas: i64,
	#[serde(default, rename = "lastReset")]
	last_reset: i64,
}

/// `apikeys` map in the order the file lists it.
#[derive(Default)]
struct LegacyApikeys(Vec<PersistedCredential>);

impl<'de> Deserialize<'de> for LegacyApikeys {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		struct EntriesVisitor;

		impl<'de> serde::de::Visitor<'de> for EntriesVisitor {
			type Value = LegacyApikeys;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a map of credential id to credential")
			}

			fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
			where
				A: serde::de::MapAccess<'de>,
			{
				let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
				while let Some((id, entry)) = map.next_entry::<String, LegacyEntry>()? {
					entries.push(PersistedCredential {
						id,
						apikey: entry.apikey,
						cx: entry.cx,
						quotas: entry.quotas,
						last_reset: entry.last_reset,
					});
				}
				Ok(LegacyApikeys(entries))
			}
		}

		deserializer.deserialize_map(EntriesVisitor)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCredential {
	pub id: String,
	pub apikey: String,
	pub cx: String,
	#[serde(default)]
	pub quotas: i64,
	/// Epoch milliseconds.
	#[serde(default, alias = "lastReset")]
	pub last_reset: i64,
}

impl From<&Credential> for PersistedCredential {
	fn from(credential: &Credential) -> Self {
		Self {
			id: credential.id.as_str().to_string(),
			apikey: credential.api_key.expose().clone(),
			cx: credential.cx.clone(),
			quotas: i64::from(credential.quota),
			last_reset: credential.last_reset.timestamp_millis(),
		}
	}
}

impl From<PersistedCredential> for Credential {
	fn from(persisted: PersistedCredential) -> Self {
		Self {
			id: CredentialId(persisted.id),
			api_key: SecretString::new(persisted.apikey),
			cx: persisted.cx,
			quota: clamp_quota(persisted.quotas),
			last_reset: DateTime::from_timestamp_millis(persisted.last_reset).unwrap_or_default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn credential(quota: u32) -> Credential {
		Credential {
			id: CredentialId::new("k1"),
			api_key: SecretString::new("AIzaSy-one".into()),
			cx: "cx-one".into(),
			quota,
			last_reset: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
		}
	}

	#[test]
	fn generated_ids_are_unique() {
		assert_ne!(CredentialId::generate(), CredentialId::generate());
	}

	#[test]
	fn patch_merges_only_given_fields() {
		let mut c = credential(10);
		c.apply(CredentialPatch {
			cx: Some("cx-two".into()),
			..CredentialPatch::default()
		});
		assert_eq!(c.cx, "cx-two");
		assert_eq!(c.quota, 10);
		assert_eq!(c.api_key.expose(), "AIzaSy-one");
	}

	#[test]
	fn negative_quota_patch_clamps_to_zero() {
		let mut c = credential(10);
		c.apply(CredentialPatch::quota(-3));
		assert_eq!(c.quota, 0);
		assert!(!c.is_active());
	}

	#[test]
	fn serialized_credential_hides_key() {
		let json = serde_json::to_string(&credential(1)).unwrap();
		assert!(!json.contains("AIzaSy-one"));
		assert!(json.contains("[REDACTED]"));
	}

	#[test]
	fn persisted_form_round_trips_fields() {
		let original = credential(42);
		let back = Credential::from(PersistedCredential::from(&original));
		assert_eq!(back, original);
	}

	#[test]
	fn legacy_camel_case_reset_is_accepted() {
		let doc: PersistedDocument = serde_json::from_str(
			r#"{"credentials":[{"id":"a","apikey":"k","cx":"c","quotas":-5,"lastReset":1000}]}"#,
		)
		.unwrap();
		let c = Credential::from(doc.credentials[0].clone());
		assert_eq!(c.quota, 0);
		assert_eq!(c.last_reset.timestamp_millis(), 1000);
	}

	#[test]
	fn collections_layout_keeps_file_order_and_ids() {
		let doc: PersistedDocument = serde_json::from_str(
			r#"{"collections":{"apikeys":{
				"zz9":{"cx":"cx-z","apikey":"key-z","quotas":73,"lastReset":1700000000000},
				"aa1":{"cx":"cx-a","apikey":"key-a","quotas":-2}
			}}}"#,
		)
		.unwrap();

		let ids: Vec<_> = doc.credentials.iter().map(|c| c.id.as_str()).collect();
		assert_eq!(ids, vec!["zz9", "aa1"]);
		let first = Credential::from(doc.credentials[0].clone());
		assert_eq!(first.quota, 73);
		assert_eq!(first.api_key.expose(), "key-z");
		assert_eq!(first.last_reset.timestamp_millis(), 1_700_000_000_000);
		assert_eq!(Credential::from(doc.credentials[1].clone()).quota, 0);
	}

	#[test]
	fn collections_without_apikeys_is_an_empty_pool() {
		let doc: PersistedDocument =
			serde_json::from_str(r#"{"collections":{"other":{}}}"#).unwrap();
		assert!(doc.credentials.is_empty());
	}

	#[test]
	fn unrecognised_documents_are_rejected() {
		assert!(serde_json::from_str::<PersistedDocument>(r#"{"keys":[]}"#).is_err());
		assert!(serde_json::from_str::<PersistedDocument>(
			r#"{"credentials":[],"collections":{"apikeys":{}}}"#
		)
		.is_err());
		assert!(serde_json::from_str::<PersistedDocument>("[]").is_err());
	}

	#[test]
	fn written_layout_is_credentials_list() {
		let doc = PersistedDocument {
			credentials: vec![PersistedCredential::from(&credential(5))],
		};
		let json = serde_json::to_value(&doc).unwrap();
		assert!(json.get("credentials").is_some());
		assert!(json.get("collections").is_none());
		assert_eq!(serde_json::from_value::<PersistedDocument>(json).unwrap(), doc);
	}

	proptest! {
		#[test]
		fn clamped_quota_is_never_negative(q in any::<i64>()) {
			let clamped = clamp_quota(q);
			if q <= 0 {
				prop_assert_eq!(clamped, 0);
			} else if q <= i64::from(u32::MAX) {
				prop_assert_eq!(i64::from(clamped), q);
			}
		}
	}
}
