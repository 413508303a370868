// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the trawl server.
//!
//! Built-in defaults, then a TOML file, then `TRAWL_SERVER_*` environment
//! variables, merged field by field and resolved into a [`ServerConfig`].
//!
//! ```ignore
//! use trawl_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub store: StoreConfig,
	pub search: SearchConfig,
	pub aggregate: AggregateConfig,
	pub jobs: JobsConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Precedence, highest first:
/// 1. Environment variables (`TRAWL_SERVER_*`)
/// 2. Config file (`/etc/trawl/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Same as [`load_config`] with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, applying defaults and validation.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let store = layer.store.unwrap_or_default().finalize()?;
	let search = layer.search.unwrap_or_default().finalize()?;
	let aggregate = layer.aggregate.unwrap_or_default().finalize()?;
	let jobs = layer.jobs.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		host = %http.host,
		port = http.port,
		store = %store.path.display(),
		default_quota = store.default_quota,
		api_url = %search.api_url,
		rotation = %aggregate.rotation,
		quota_reset_enabled = jobs.quota_reset_enabled,
		quota_reset_at = %jobs.quota_reset_at,
		"server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		store,
		search,
		aggregate,
		jobs,
		logging,
	})
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use chrono::NaiveTime;
	use proptest::prelude::*;
	use trawl_aggregate::RotationMode;

	use super::*;

	#[test]
	fn empty_layer_resolves_to_defaults() {
		let config = finalize(ServerConfigLayer::default()).unwrap();
		assert_eq!(config, ServerConfig::default());
		assert_eq!(config.socket_addr(), "0.0.0.0:8080");
	}

	#[test]
	fn file_then_env_layers_stack() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[http]\nport = 7000\nhost = \"127.0.0.1\"\n\n[aggregate]\nrotation = \"refresh\""
		)
		.unwrap();

		let mut merged = ServerConfigLayer::default();
		merged.merge(TomlSource::new(file.path()).load().unwrap());
		merged.merge(
			EnvSource::load_from(|name| (name == "TRAWL_SERVER_PORT").then(|| "7100".to_string()))
				.unwrap(),
		);
		let config = finalize(merged).unwrap();

		assert_eq!(config.socket_addr(), "127.0.0.1:7100");
		assert_eq!(config.aggregate.rotation, RotationMode::Refresh);
	}

	#[test]
	fn invalid_section_fails_the_whole_config() {
		let layer = ServerConfigLayer {
			jobs: Some(JobsConfigLayer {
				quota_reset_at: Some("noon".into()),
				..Default::default()
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::InvalidValue { .. })));
	}

	proptest! {
		#[test]
		fn any_clock_time_is_accepted(hour in 0u32..24, minute in 0u32..60) {
			let layer = ServerConfigLayer {
				jobs: Some(JobsConfigLayer {
					quota_reset_at: Some(format!("{hour:02}:{minute:02}")),
					..Default::default()
				}),
				..Default::default()
			};
			let config = finalize(layer).unwrap();
			prop_assert_eq!(
				config.jobs.quota_reset_at,
				NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
			);
		}
	}
}
