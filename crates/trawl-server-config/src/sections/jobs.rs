// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job settings.

use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::layer::take;

pub const DEFAULT_QUOTA_RESET_AT: &str = "07:00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
	pub quota_reset_enabled: bool,
	/// Daily, UTC.
	pub quota_reset_at: NaiveTime,
}

impl Default for JobsConfig {
	fn default() -> Self {
		Self {
			quota_reset_enabled: true,
			quota_reset_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct JobsConfigLayer {
	#[serde(default)]
	pub quota_reset_enabled: Option<bool>,
	/// `HH:MM`, UTC.
	#[serde(default)]
	pub quota_reset_at: Option<String>,
}

impl JobsConfigLayer {
	pub fn merge(&mut self, other: JobsConfigLayer) {
		take(&mut self.quota_reset_enabled, other.quota_reset_enabled);
		take(&mut self.quota_reset_at, other.quota_reset_at);
	}

	pub fn finalize(self) -> Result<JobsConfig, ConfigError> {
		let raw = self
			.quota_reset_at
			.unwrap_or_else(|| DEFAULT_QUOTA_RESET_AT.to_string());
		let quota_reset_at = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
			ConfigError::invalid("jobs.quota_reset_at", format!("'{raw}' is not HH:MM: {e}"))
		})?;

		Ok(JobsConfig {
			quota_reset_enabled: self.quota_reset_enabled.unwrap_or(true),
			quota_reset_at,
		})
	}
}
