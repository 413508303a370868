// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::backend::StoreBackend;
use crate::coalescer::{CoalescerConfig, FlushTarget, WriteCoalescer};
use crate::error::Result;
use crate::model::{
	ConsumeOutcome, Credential, CredentialId, CredentialPatch, NewCredential, PersistedCredential,
	PersistedDocument,
};

/// Quota a new or freshly reset credential starts with.
pub const DEFAULT_QUOTA: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
	pub default_quota: u32,
	pub coalescer: CoalescerConfig,
}

impl Default for StoreConfig {
	fn default() -> Self {
		Self {
			default_quota: DEFAULT_QUOTA,
			coalescer: CoalescerConfig::default(),
		}
	}
}

impl StoreConfig {
	pub fn with_timings(mut self, flush_interval: Duration, quiescence: Duration) -> Self {
		self.coalescer = CoalescerConfig {
			flush_interval,
			quiescence,
		};
		self
	}
}

type Records = Arc<RwLock<Vec<Credential>>>;

#[derive(Debug)]
struct Snapshotter {
	records: Records,
	backend: Arc<dyn StoreBackend>,
}

#[async_trait]
impl FlushTarget for Snapshotter {
	async fn write_snapshot(&self) -> Result<()> {
		let document = {
			let records = self.records.read().await;
			PersistedDocument {
				credentials: records.iter().map(PersistedCredential::from).collect(),
			}
		};
		self.backend.save(&document).await
	}
}

#[derive(Debug)]
struct Inner {
	records: Records,
	snapshotter: Arc<Snapshotter>,
	coalescer: Arc<WriteCoalescer>,
	task: Mutex<Option<JoinHandle<()>>>,
	default_quota: u32,
}

/// Shared handle to the credential collection. Clones share state.
#[derive(Debug, Clone)]
pub struct CredentialStore {
	inner: Arc<Inner>,
}

impl CredentialStore {
	/// Load the persisted document and start the write coalescer.
	///
	/// Must be called inside a Tokio runtime.
	pub async fn open(backend: Arc<dyn StoreBackend>, config: StoreConfig) -> Result<Self> {
		let document = backend.load().await?.unwrap_or_default();
		let records: Vec<Credential> = document
			.credentials
			.into_iter()
			.map(Credential::from)
			.collect();
		info!(credentials = records.len(), "credential store loaded");

		let records: Records = Arc::new(RwLock::new(records));
		let snapshotter = Arc::new(Snapshotter {
			records: Arc::clone(&records),
			backend,
		});
		let coalescer = Arc::new(WriteCoalescer::new(config.coalescer));

		let task = {
			let coalescer = Arc::clone(&coalescer);
			let snapshotter = Arc::clone(&snapshotter);
			tokio::spawn(async move { coalescer.run(snapshotter.as_ref()).await })
		};

		Ok(Self {
			inner: Arc::new(Inner {
				records,
				snapshotter,
				coalescer,
				task: Mutex::new(Some(task)),
				default_quota: config.default_quota,
			}),
		})
	}

	pub fn default_quota(&self) -> u32 {
		self.inner.default_quota
	}

	/// All credentials in insertion order.
	pub async fn list(&self) -> Vec<Credential> {
		self.inner.records.read().await.clone()
	}

	/// Alias of [`CredentialStore::list`].
	pub async fn get_all(&self) -> Vec<Credential> {
		self.list().await
	}

	pub async fn len(&self) -> usize {
		self.inner.records.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	/// Credentials with quota left.
	pub async fn active_count(&self) -> usize {
		self
			.inner
			.records
			.read()
			.await
			.iter()
			.filter(|c| c.is_active())
			.count()
	}

	pub async fn get(&self, id: &CredentialId) -> Option<Credential> {
		self
			.inner
			.records
			.read()
			.await
			.iter()
			.find(|c| &c.id == id)
			.cloned()
	}

	#[instrument(skip(self, new), fields(cx = %new.cx))]
	pub async fn create(&self, new: NewCredential) -> Credential {
		let credential = Credential {
			id: CredentialId::generate(),
			api_key: new.api_key,
			cx: new.cx,
			quota: self.inner.default_quota,
			last_reset: Utc::now(),
		};

		self.inner.records.write().await.push(credential.clone());
		self.inner.coalescer.mark_dirty();
		info!(id = %credential.id, "credential created");
		credential
	}

	/// Merge `patch` into a known credential, or create one when `id` is `None`.
	///
	/// Unknown ids yield `None`. Creation needs both `api_key` and `cx`; a
	/// created record gets the default quota unless the patch sets one.
	#[instrument(skip(self, patch))]
	pub async fn upsert(&self, id: Option<&CredentialId>, patch: CredentialPatch) -> Option<Credential> {
		match id {
			Some(id) => self.merge(id, patch).await,
			None => {
				let (Some(api_key), Some(cx)) = (patch.api_key.clone(), patch.cx.clone()) else {
					warn!("upsert without id needs both api key and cx");
					return None;
				};
				let created = self.create(NewCredential { api_key, cx }).await;
				if patch.quota.is_none() && patch.last_reset.is_none() {
					return Some(created);
				}
				let rest = CredentialPatch {
					api_key: None,
					cx: None,
					..patch
				};
				self.merge(&created.id, rest).await
			}
		}
	}

	async fn merge(&self, id: &CredentialId, patch: CredentialPatch) -> Option<Credential> {
		let merged = {
			let mut records = self.inner.records.write().await;
			let record = records.iter_mut().find(|c| &c.id == id)?;
			record.apply(patch);
			record.clone()
		};
		self.inner.coalescer.mark_dirty();
		debug!(id = %id, quota = merged.quota, "credential updated");
		Some(merged)
	}

	#[instrument(skip(self))]
	pub async fn delete(&self, id: &CredentialId) -> Option<Credential> {
		let removed = {
			let mut records = self.inner.records.write().await;
			let index = records.iter().position(|c| &c.id == id)?;
			records.remove(index)
		};
		self.inner.coalescer.mark_dirty();
		info!("credential deleted");
		Some(removed)
	}

	/// Take one unit of quota if any is left. Check and decrement happen
	/// under one write lock.
	pub async fn try_consume(&self, id: &CredentialId) -> ConsumeOutcome {
		let outcome = {
			let mut records = self.inner.records.write().await;
			match records.iter_mut().find(|c| &c.id == id) {
				None => ConsumeOutcome::Missing,
				Some(record) if record.quota == 0 => ConsumeOutcome::Exhausted,
				Some(record) => {
					record.quota -= 1;
					ConsumeOutcome::Consumed {
						remaining: record.quota,
					}
				}
			}
		};

		if matches!(outcome, ConsumeOutcome::Consumed { .. }) {
			self.inner.coalescer.mark_dirty();
		}
		outcome
	}

	/// Force a credential's quota to zero. Returns false if it no longer exists.
	pub async fn exhaust(&self, id: &CredentialId) -> bool {
		let changed = {
			let mut records = self.inner.records.write().await;
			match records.iter_mut().find(|c| &c.id == id) {
				None => return false,
				Some(record) => std::mem::replace(&mut record.quota, 0) != 0,
			}
		};

		if changed {
			self.inner.coalescer.mark_dirty();
			debug!(id = %id, "credential exhausted");
		}
		true
	}

	/// Restore every credential to `quota` and stamp `now`. Returns how many were touched.
	#[instrument(skip(self))]
	pub async fn reset_all(&self, quota: u32, now: DateTime<Utc>) -> usize {
		let touched = {
			let mut records = self.inner.records.write().await;
			for record in records.iter_mut() {
				record.apply(CredentialPatch::reset(quota, now));
			}
			records.len()
		};

		if touched > 0 {
			self.inner.coalescer.mark_dirty();
		}
		info!(touched, quota, "credential quotas reset");
		touched
	}

	/// Write pending changes now instead of waiting for the coalescer.
	pub async fn flush(&self) -> Result<()> {
		self
			.inner
			.coalescer
			.flush_now(self.inner.snapshotter.as_ref())
			.await
			.map(|_| ())
	}

	pub fn is_dirty(&self) -> bool {
		self.inner.coalescer.is_dirty()
	}

	/// Completed background and explicit writes.
	pub fn flush_count(&self) -> u64 {
		self.inner.coalescer.flush_count()
	}

	/// Stop the coalescer and make sure everything is on disk.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) -> Result<()> {
		self.inner.coalescer.shutdown();
		if let Some(task) = self.inner.task.lock().await.take() {
			if let Err(e) = task.await {
				warn!(error = %e, "credential coalescer task ended abnormally");
			}
		}
		self.flush().await
	}
}
