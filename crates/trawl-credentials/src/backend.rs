// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where the credential document is durably kept.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::model::PersistedDocument;

#[async_trait]
pub trait StoreBackend: Send + Sync + std::fmt::Debug {
	/// `Ok(None)` when nothing has been written yet.
	async fn load(&self) -> Result<Option<PersistedDocument>>;

	/// Replace the stored document as a whole.
	async fn save(&self, document: &PersistedDocument) -> Result<()>;
}

/// JSON file, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct FileBackend {
	path: PathBuf,
}

impl FileBackend {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait]
impl StoreBackend for FileBackend {
	async fn load(&self) -> Result<Option<PersistedDocument>> {
		let contents = match fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StoreError::io(&self.path, e)),
		};

		if contents.trim().is_empty() {
			return Ok(None);
		}

		Ok(Some(serde_json::from_str(&contents)?))
	}

	async fn save(&self, document: &PersistedDocument) -> Result<()> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StoreError::io(parent, e))?;
		}

		let contents = serde_json::to_vec_pretty(document)?;
		let temp_path = self.path.with_extension("tmp");

		let mut file = fs::File::create(&temp_path)
			.await
			.map_err(|e| StoreError::io(&temp_path, e))?;
		file
			.write_all(&contents)
			.await
			.map_err(|e| StoreError::io(&temp_path, e))?;
		file
			.sync_all()
			.await
			.map_err(|e| StoreError::io(&temp_path, e))?;
		drop(file);

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let perms = std::fs::Permissions::from_mode(0o600);
			if let Err(e) = fs::set_permissions(&temp_path, perms).await {
				warn!(path = ?temp_path, error = %e, "could not restrict credential file to 0600");
			}
		}

		fs::rename(&temp_path, &self.path)
			.await
			.map_err(|e| StoreError::io(&self.path, e))?;

		debug!(path = ?self.path, credentials = document.credentials.len(), "credential document written");
		Ok(())
	}
}

/// In-process backend. Records every save so tests can count writes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	initial: Option<PersistedDocument>,
	saved: Mutex<Vec<PersistedDocument>>,
	save_calls: AtomicUsize,
	failing: AtomicBool,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_document(document: PersistedDocument) -> Self {
		Self {
			initial: Some(document),
			..Self::default()
		}
	}

	/// Make subsequent saves fail until switched back.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	/// Successful saves.
	pub async fn writes(&self) -> usize {
		self.saved.lock().await.len()
	}

	/// All save attempts, including failed ones.
	pub fn attempts(&self) -> usize {
		self.save_calls.load(Ordering::SeqCst)
	}

	pub async fn last_saved(&self) -> Option<PersistedDocument> {
		self.saved.lock().await.last().cloned()
	}
}

#[async_trait]
impl StoreBackend for MemoryBackend {
	async fn load(&self) -> Result<Option<PersistedDocument>> {
		if let Some(last) = self.saved.lock().await.last() {
			return Ok(Some(last.clone()));
		}
		Ok(self.initial.clone())
	}

	async fn save(&self, document: &PersistedDocument) -> Result<()> {
		self.save_calls.fetch_add(1, Ordering::SeqCst);
		if self.failing.load(Ordering::SeqCst) {
			return Err(StoreError::Backend("memory backend set to fail".into()));
		}
		self.saved.lock().await.push(document.clone());
		Ok(())
	}
}
