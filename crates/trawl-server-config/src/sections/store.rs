// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential store location, write coalescing and starting quota.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::layer::take;

pub const DEFAULT_STORE_PATH: &str = "db.json";
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 500;
pub const DEFAULT_QUIESCENCE_MS: u64 = 600;
pub const DEFAULT_QUOTA: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
	pub path: PathBuf,
	pub flush_interval: Duration,
	pub quiescence: Duration,
	pub default_quota: u32,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from(DEFAULT_STORE_PATH),
			flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
			quiescence: Duration::from_millis(DEFAULT_QUIESCENCE_MS),
			default_quota: DEFAULT_QUOTA,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StoreConfigLayer {
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub flush_interval_ms: Option<u64>,
	#[serde(default)]
	pub quiescence_ms: Option<u64>,
	#[serde(default)]
	pub default_quota: Option<u32>,
}

impl StoreConfigLayer {
	pub fn merge(&mut self, other: StoreConfigLayer) {
		take(&mut self.path, other.path);
		take(&mut self.flush_interval_ms, other.flush_interval_ms);
		take(&mut self.quiescence_ms, other.quiescence_ms);
		take(&mut self.default_quota, other.default_quota);
	}

	pub fn finalize(self) -> Result<StoreConfig, ConfigError> {
		let flush_interval_ms = self.flush_interval_ms.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
		let quiescence_ms = self.quiescence_ms.unwrap_or(DEFAULT_QUIESCENCE_MS);
		let default_quota = self.default_quota.unwrap_or(DEFAULT_QUOTA);

		if flush_interval_ms == 0 {
			return Err(ConfigError::invalid("store.flush_interval_ms", "must be greater than 0"));
		}
		if quiescence_ms == 0 {
			return Err(ConfigError::invalid("store.quiescence_ms", "must be greater than 0"));
		}
		if default_quota == 0 {
			return Err(ConfigError::invalid("store.default_quota", "must be greater than 0"));
		}

		let path = self
			.path
			.filter(|p| !p.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());

		Ok(StoreConfig {
			path: PathBuf::from(path),
			flush_interval: Duration::from_millis(flush_interval_ms),
			quiescence: Duration::from_millis(quiescence_ms),
			default_quota,
		})
	}
}
