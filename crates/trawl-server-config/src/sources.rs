// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file, the environment.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AggregateConfigLayer, HttpConfigLayer, JobsConfigLayer, LoggingConfigLayer, SearchConfigLayer,
	StoreConfigLayer,
};

/// Higher overrides lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// A missing file is an empty layer, not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/trawl/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variables, `TRAWL_SERVER_<FIELD>`.
///
/// A few legacy names are honoured as fallbacks: `PORT`, `PSE_APIURL`
/// and `PSE_GL`.
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an arbitrary variable lookup.
	pub fn load_from<F>(lookup: F) -> Result<ServerConfigLayer, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let env = Env { lookup };
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env.var("TRAWL_SERVER_HOST"),
				port: env.u16_or("TRAWL_SERVER_PORT", "PORT")?,
			}),
			store: Some(StoreConfigLayer {
				path: env.var("TRAWL_SERVER_STORE_PATH"),
				flush_interval_ms: env.u64("TRAWL_SERVER_STORE_FLUSH_INTERVAL_MS")?,
				quiescence_ms: env.u64("TRAWL_SERVER_STORE_QUIESCENCE_MS")?,
				default_quota: env.u32("TRAWL_SERVER_DEFAULT_QUOTA")?,
			}),
			search: Some(SearchConfigLayer {
				api_url: env
					.var("TRAWL_SERVER_CSE_API_URL")
					.or_else(|| env.var("PSE_APIURL")),
				locale: env
					.var("TRAWL_SERVER_CSE_LOCALE")
					.or_else(|| env.var("PSE_GL")),
				timeout_secs: env.u64("TRAWL_SERVER_CSE_TIMEOUT_SECS")?,
				retry_attempts: env.u32("TRAWL_SERVER_CSE_RETRY_ATTEMPTS")?,
			}),
			aggregate: Some(AggregateConfigLayer {
				default_count: env.u32("TRAWL_SERVER_DEFAULT_COUNT")?,
				rotation: env.var("TRAWL_SERVER_ROTATION"),
			}),
			jobs: Some(JobsConfigLayer {
				quota_reset_enabled: env.bool("TRAWL_SERVER_QUOTA_RESET_ENABLED"),
				quota_reset_at: env.var("TRAWL_SERVER_QUOTA_RESET_AT"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env.var("TRAWL_SERVER_LOG_LEVEL"),
			}),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Self::load_from(|name| std::env::var(name).ok())
	}
}

struct Env<F> {
	lookup: F,
}

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parsed<T: std::str::FromStr>(&self, name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v
				.trim()
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::invalid(name, format!("invalid {kind} value '{v}'"))),
			None => Ok(None),
		}
	}

	fn u16_or(&self, name: &str, fallback: &str) -> Result<Option<u16>, ConfigError> {
		match self.parsed(name, "u16")? {
			Some(v) => Ok(Some(v)),
			None => self.parsed(fallback, "u16"),
		}
	}

	fn u32(&self, name: &str) -> Result<Option<u32>, ConfigError> {
		self.parsed(name, "u32")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		self.parsed(name, "u64")
	}
}
