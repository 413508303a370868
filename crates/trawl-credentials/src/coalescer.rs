// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Debounced write-behind for the credential document.
//!
//! The coalescer is idle until the first mutation. While active it flushes at
//! most once per `flush_interval`, and only when dirty. Each mutation pushes a
//! quiescence deadline out by `quiescence`; when the deadline passes the
//! coalescer flushes one last time (if still dirty) and goes idle again.
//!
//! A failed flush leaves the store dirty and is retried on the next tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerConfig {
	pub flush_interval: Duration,
	pub quiescence: Duration,
}

impl Default for CoalescerConfig {
	fn default() -> Self {
		Self {
			flush_interval: Duration::from_millis(500),
			quiescence: Duration::from_millis(600),
		}
	}
}

/// Something that can write the current state out.
#[async_trait]
pub trait FlushTarget: Send + Sync {
	async fn write_snapshot(&self) -> Result<()>;
}

#[derive(Debug)]
pub struct WriteCoalescer {
	config: CoalescerConfig,
	dirty: AtomicBool,
	shutdown: AtomicBool,
	last_touch: StdMutex<Instant>,
	wake: Notify,
	write_lock: Mutex<()>,
	flushes: AtomicU64,
}

impl WriteCoalescer {
	pub fn new(config: CoalescerConfig) -> Self {
		Self {
			config,
			dirty: AtomicBool::new(false),
			shutdown: AtomicBool::new(false),
			last_touch: StdMutex::new(Instant::now()),
			wake: Notify::new(),
			write_lock: Mutex::new(()),
			flushes: AtomicU64::new(0),
		}
	}

	pub fn config(&self) -> CoalescerConfig {
		self.config
	}

	/// Record a mutation and wake the background loop.
	pub fn mark_dirty(&self) {
		self.touch();
		self.dirty.store(true, Ordering::SeqCst);
		self.wake.notify_one();
	}

	pub fn is_dirty(&self) -> bool {
		self.dirty.load(Ordering::SeqCst)
	}

	/// Completed writes since construction.
	pub fn flush_count(&self) -> u64 {
		self.flushes.load(Ordering::SeqCst)
	}

	pub fn shutdown(&self) {
		self.shutdown.store(true, Ordering::SeqCst);
		self.wake.notify_one();
	}

	pub fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::SeqCst)
	}

	/// Write now if dirty. Returns whether a write happened.
	///
	/// Writes are serialized so an older snapshot can never land after a newer one.
	pub async fn flush_now<T>(&self, target: &T) -> Result<bool>
	where
		T: FlushTarget + ?Sized,
	{
		let _guard = self.write_lock.lock().await;
		if !self.dirty.swap(false, Ordering::SeqCst) {
			return Ok(false);
		}

		match target.write_snapshot().await {
			Ok(()) => {
				self.flushes.fetch_add(1, Ordering::SeqCst);
				Ok(true)
			}
			Err(e) => {
				self.dirty.store(true, Ordering::SeqCst);
				Err(e)
			}
		}
	}

	/// Background loop. Returns after [`WriteCoalescer::shutdown`], flushing
	/// pending changes first.
	pub async fn run<T>(&self, target: &T)
	where
		T: FlushTarget + ?Sized,
	{
		info!(
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			quiescence_ms = self.config.quiescence.as_millis() as u64,
			"credential write coalescer started"
		);

		'idle: loop {
			while !self.is_dirty() {
				if self.is_shutdown() {
					break 'idle;
				}
				self.wake.notified().await;
			}

			debug!("coalescer active");
			let mut ticker = tokio::time::interval(self.config.flush_interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			ticker.tick().await;

			loop {
				let deadline = self.quiet_deadline();
				tokio::select! {
					_ = ticker.tick() => {
						self.flush_logged(target, "interval").await;
					}
					_ = tokio::time::sleep_until(deadline) => {
						if self.quiet_deadline() > Instant::now() {
							continue;
						}
						self.flush_logged(target, "quiescence").await;
						if self.is_dirty() {
							// Failed; keep ticking and retry.
							self.touch();
							continue;
						}
						debug!("coalescer idle");
						continue 'idle;
					}
					_ = self.wake.notified() => {
						if self.is_shutdown() {
							break 'idle;
						}
					}
				}
			}
		}

		self.flush_logged(target, "shutdown").await;
		info!(flushes = self.flush_count(), "credential write coalescer stopped");
	}

	async fn flush_logged<T>(&self, target: &T, reason: &'static str)
	where
		T: FlushTarget + ?Sized,
	{
		match self.flush_now(target).await {
			Ok(true) => debug!(reason, "credential document flushed"),
			Ok(false) => {}
			Err(e) => error!(reason, error = %e, "credential flush failed; will retry"),
		}
	}

	fn touch(&self) {
		if let Ok(mut last) = self.last_touch.lock() {
			*last = Instant::now();
		}
	}

	fn quiet_deadline(&self) -> Instant {
		let last = match self.last_touch.lock() {
			Ok(last) => *last,
			Err(poisoned) => *poisoned.into_inner(),
		};
		last + self.config.quiescence
	}
}
