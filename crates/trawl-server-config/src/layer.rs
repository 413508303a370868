// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	AggregateConfigLayer, HttpConfigLayer, JobsConfigLayer, LoggingConfigLayer, SearchConfigLayer,
	StoreConfigLayer,
};

/// Every field optional so sources can be stacked.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub store: Option<StoreConfigLayer>,
	#[serde(default)]
	pub search: Option<SearchConfigLayer>,
	#[serde(default)]
	pub aggregate: Option<AggregateConfigLayer>,
	#[serde(default)]
	pub jobs: Option<JobsConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// `other` wins field by field.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.store, other.store, StoreConfigLayer::merge);
		merge_option(&mut self.search, other.search, SearchConfigLayer::merge);
		merge_option(
			&mut self.aggregate,
			other.aggregate,
			AggregateConfigLayer::merge,
		);
		merge_option(&mut self.jobs, other.jobs, JobsConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

/// Overwrite `target` when `source` is set.
pub(crate) fn take<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merging_empty_keeps_base() {
		let mut base = ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9000),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer::default());
		assert_eq!(base.http.unwrap().port, Some(9000));
	}

	#[test]
	fn later_layer_wins_per_field() {
		let mut base = ServerConfigLayer {
			store: Some(StoreConfigLayer {
				path: Some("/var/lib/trawl/db.json".into()),
				flush_interval_ms: Some(250),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			store: Some(StoreConfigLayer {
				flush_interval_ms: Some(1000),
				..Default::default()
			}),
			jobs: Some(JobsConfigLayer {
				quota_reset_enabled: Some(false),
				..Default::default()
			}),
			..Default::default()
		});

		let store = base.store.unwrap();
		assert_eq!(store.path.as_deref(), Some("/var/lib/trawl/db.json"));
		assert_eq!(store.flush_interval_ms, Some(1000));
		assert_eq!(base.jobs.unwrap().quota_reset_enabled, Some(false));
	}

	#[test]
	fn toml_sections_parse() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			port = 3000

			[aggregate]
			rotation = "refresh"
			default_count = 40

			[jobs]
			quota_reset_at = "06:30"
			"#,
		)
		.unwrap();

		assert_eq!(layer.http.unwrap().port, Some(3000));
		let aggregate = layer.aggregate.unwrap();
		assert_eq!(aggregate.rotation.as_deref(), Some("refresh"));
		assert_eq!(aggregate.default_count, Some(40));
		assert_eq!(layer.jobs.unwrap().quota_reset_at.as_deref(), Some("06:30"));
	}

	#[test]
	fn unknown_section_is_rejected() {
		assert!(toml::from_str::<ServerConfigLayer>("[database]\nurl = \"x\"").is_err());
	}
}
