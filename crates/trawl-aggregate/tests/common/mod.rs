// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use trawl_aggregate::{Page, PageFetcher, PageItem, PageRequest};
use trawl_credentials::{
	CredentialId, CredentialPatch, CredentialStore, MemoryBackend, NewCredential, StoreConfig,
};

#[derive(Debug, thiserror::Error)]
#[error("scripted upstream failure for {cx}")]
pub struct ScriptedError {
	pub cx: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub cx: String,
	pub query: String,
	pub start: u32,
}

/// Deterministic upstream. Each query has a fixed number of results; the
/// result at rank `r` lives on its own site unless overridden.
#[derive(Default)]
pub struct ScriptedFetcher {
	totals: HashMap<String, u32>,
	sites: HashMap<(String, u32), String>,
	failing_cx: Mutex<HashSet<String>>,
	calls: Mutex<Vec<Call>>,
	delay: Option<Duration>,
	late_credential: Option<CredentialStore>,
	late_added: AtomicBool,
	max_results: Option<u32>,
}

impl ScriptedFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_results(mut self, query: &str, total: u32) -> Self {
		self.totals.insert(query.to_string(), total);
		self
	}

	/// Put the result at `rank` of `query` on `site`.
	pub fn with_site(mut self, query: &str, rank: u32, site: &str) -> Self {
		self.sites.insert((query.to_string(), rank), site.to_string());
		self
	}

	pub fn failing_for(self, cx: &str) -> Self {
		self.failing_cx.lock().unwrap().insert(cx.to_string());
		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	/// Advertise an upstream per-query result limit.
	pub fn with_max_results(mut self, max: u32) -> Self {
		self.max_results = Some(max);
		self
	}

	/// Append a fresh full-quota credential (`cx-late`) to `store` during the first fetch.
	pub fn adding_credential_to(mut self, store: CredentialStore) -> Self {
		self.late_credential = Some(store);
		self
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().unwrap().len()
	}

	pub fn starts_for(&self, query: &str) -> Vec<u32> {
		self
			.calls()
			.into_iter()
			.filter(|c| c.query == query)
			.map(|c| c.start)
			.collect()
	}
}

pub fn site_for(query: &str, rank: u32) -> String {
	format!("{}-{rank}.example", query.replace(' ', "-"))
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
	type Error = ScriptedError;

	fn max_results(&self) -> Option<u32> {
		self.max_results
	}

	async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Page, ScriptedError> {
		self.calls.lock().unwrap().push(Call {
			cx: request.cx.to_string(),
			query: request.query.to_string(),
			start: request.start,
		});

		if let Some(store) = &self.late_credential {
			if !self.late_added.swap(true, Ordering::SeqCst) {
				store.create(NewCredential::new("key-late", "cx-late")).await;
			}
		}

		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}

		if self.failing_cx.lock().unwrap().contains(request.cx) {
			return Err(ScriptedError {
				cx: request.cx.to_string(),
			});
		}

		let total = self.totals.get(request.query).copied().unwrap_or(0);
		let last = (request.start + 9).min(total);
		let items = (request.start..=last)
			.map(|rank| {
				let site = self
					.sites
					.get(&(request.query.to_string(), rank))
					.cloned()
					.unwrap_or_else(|| site_for(request.query, rank));
				PageItem {
					url: format!("https://{site}/{}/{rank}", request.query.replace(' ', "-")),
					title: format!("{} #{rank}", request.query),
					display_link: Some(site),
				}
			})
			.collect();

		Ok(Page { items })
	}
}

/// Store with one credential per quota, named `cx-0`, `cx-1`, ...
pub async fn store_with(quotas: &[u32]) -> (CredentialStore, Vec<CredentialId>) {
	let store = CredentialStore::open(Arc::new(MemoryBackend::new()), StoreConfig::default())
		.await
		.unwrap();
	let mut ids = Vec::new();
	for (i, quota) in quotas.iter().enumerate() {
		let created = store
			.create(NewCredential::new(format!("key-{i}"), format!("cx-{i}")))
			.await;
		store
			.upsert(Some(&created.id), CredentialPatch::quota(i64::from(*quota)))
			.await
			.unwrap();
		ids.push(created.id);
	}
	(store, ids)
}

pub async fn quota_of(store: &CredentialStore, id: &CredentialId) -> u32 {
	store.get(id).await.unwrap().quota
}

pub fn queries(list: &[&str]) -> Vec<String> {
	list.iter().map(|q| q.to_string()).collect()
}
