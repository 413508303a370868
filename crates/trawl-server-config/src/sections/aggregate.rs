// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;
use trawl_aggregate::RotationMode;

use crate::error::ConfigError;
use crate::layer::take;

pub const DEFAULT_COUNT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateConfig {
	/// Per-query result target when a request does not give one.
	pub default_count: u32,
	pub rotation: RotationMode,
}

impl Default for AggregateConfig {
	fn default() -> Self {
		Self {
			default_count: DEFAULT_COUNT,
			rotation: RotationMode::default(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AggregateConfigLayer {
	#[serde(default)]
	pub default_count: Option<u32>,
	#[serde(default)]
	pub rotation: Option<String>,
}

impl AggregateConfigLayer {
	pub fn merge(&mut self, other: AggregateConfigLayer) {
		take(&mut self.default_count, other.default_count);
		take(&mut self.rotation, other.rotation);
	}

	pub fn finalize(self) -> Result<AggregateConfig, ConfigError> {
		let rotation = match self.rotation {
			Some(raw) => raw
				.parse::<RotationMode>()
				.map_err(|message| ConfigError::invalid("aggregate.rotation", message))?,
			None => RotationMode::default(),
		};

		Ok(AggregateConfig {
			default_count: self.default_count.unwrap_or(DEFAULT_COUNT),
			rotation,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_continue() {
		let config = AggregateConfigLayer::default().finalize().unwrap();
		assert_eq!(config.rotation, RotationMode::Continue);
		assert_eq!(config.default_count, 100);
	}

	#[test]
	fn parses_refresh() {
		let config = AggregateConfigLayer {
			rotation: Some("REFRESH".into()),
			..Default::default()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.rotation, RotationMode::Refresh);
	}

	#[test]
	fn unknown_rotation_is_an_error() {
		let err = AggregateConfigLayer {
			rotation: Some("random".into()),
			..Default::default()
		}
		.finalize()
		.unwrap_err();
		assert!(err.to_string().contains("aggregate.rotation"));
	}
}
