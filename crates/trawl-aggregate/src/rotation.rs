// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential selection.
//!
//! A cursor is built from a snapshot of the store and only ever moves
//! forward. Quota only decreases during a call, so the first credential
//! with quota left can never be behind the cursor, and advancing past a
//! retired credential is the same as rescanning from the start.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trawl_common_secret::SecretString;
use trawl_credentials::{Credential, CredentialId, CredentialStore};

/// How the cursor carries over between the queries of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
	/// One snapshot and cursor for the whole call. A query starts with
	/// whatever credential the previous query ended on.
	#[default]
	Continue,
	/// Re-read the store before each query and start from the first
	/// credential with quota.
	Refresh,
}

impl fmt::Display for RotationMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RotationMode::Continue => f.write_str("continue"),
			RotationMode::Refresh => f.write_str("refresh"),
		}
	}
}

impl FromStr for RotationMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"continue" => Ok(RotationMode::Continue),
			"refresh" => Ok(RotationMode::Refresh),
			other => Err(format!("unknown rotation mode '{other}' (expected continue or refresh)")),
		}
	}
}

/// What the driver needs to spend a credential.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub id: CredentialId,
	pub api_key: SecretString,
	pub cx: String,
}

impl From<Credential> for Candidate {
	fn from(credential: Credential) -> Self {
		Self {
			id: credential.id,
			api_key: credential.api_key,
			cx: credential.cx,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct RotationCursor {
	candidates: Vec<Candidate>,
	position: usize,
}

impl RotationCursor {
	/// Keep credentials with quota left, in store order.
	pub fn from_snapshot(credentials: impl IntoIterator<Item = Credential>) -> Self {
		Self {
			candidates: credentials
				.into_iter()
				.filter(Credential::is_active)
				.map(Candidate::from)
				.collect(),
			position: 0,
		}
	}

	pub async fn from_store(store: &CredentialStore) -> Self {
		Self::from_snapshot(store.list().await)
	}

	/// The credential to spend next, if any remain.
	pub fn current(&self) -> Option<&Candidate> {
		self.candidates.get(self.position)
	}

	/// Retire the current credential for the rest of this cursor's life.
	pub fn retire_current(&mut self) {
		if self.position < self.candidates.len() {
			self.position += 1;
		}
	}

	pub fn is_exhausted(&self) -> bool {
		self.position >= self.candidates.len()
	}

	pub fn remaining(&self) -> usize {
		self.candidates.len().saturating_sub(self.position)
	}
}
