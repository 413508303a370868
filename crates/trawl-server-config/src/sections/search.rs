// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Upstream search API settings.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::layer::take;

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
	pub api_url: String,
	/// Sent upstream as both `gl` and `hl`.
	pub locale: Option<String>,
	pub timeout: Duration,
	/// Attempts per page before the credential is retired.
	pub retry_attempts: u32,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			locale: None,
			timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
			retry_attempts: DEFAULT_RETRY_ATTEMPTS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchConfigLayer {
	#[serde(default)]
	pub api_url: Option<String>,
	#[serde(default)]
	pub locale: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub retry_attempts: Option<u32>,
}

impl SearchConfigLayer {
	pub fn merge(&mut self, other: SearchConfigLayer) {
		take(&mut self.api_url, other.api_url);
		take(&mut self.locale, other.locale);
		take(&mut self.timeout_secs, other.timeout_secs);
		take(&mut self.retry_attempts, other.retry_attempts);
	}

	pub fn finalize(self) -> Result<SearchConfig, ConfigError> {
		let api_url = self
			.api_url
			.map(|u| u.trim().to_string())
			.unwrap_or_else(|| DEFAULT_API_URL.to_string());
		if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
			return Err(ConfigError::invalid(
				"search.api_url",
				format!("'{api_url}' is not an http(s) URL"),
			));
		}

		let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
		if timeout_secs == 0 {
			return Err(ConfigError::invalid("search.timeout_secs", "must be greater than 0"));
		}

		let retry_attempts = self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS);
		if retry_attempts == 0 {
			return Err(ConfigError::invalid("search.retry_attempts", "must be at least 1"));
		}

		Ok(SearchConfig {
			api_url,
			locale: self.locale.filter(|l| !l.trim().is_empty()),
			timeout: Duration::from_secs(timeout_secs),
			retry_attempts,
		})
	}
}
