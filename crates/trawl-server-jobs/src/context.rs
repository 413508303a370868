// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::TriggerSource;

/// Handed to each attempt of a job run.
#[derive(Debug, Clone)]
pub struct JobContext {
	pub run_id: String,
	pub triggered_by: TriggerSource,
	pub attempt: u32,
	pub cancellation_token: CancellationToken,
}

impl JobContext {
	/// Context for driving a job outside the scheduler.
	pub fn manual() -> Self {
		Self {
			run_id: uuid::Uuid::new_v4().to_string(),
			triggered_by: TriggerSource::Manual,
			attempt: 0,
			cancellation_token: CancellationToken::new(),
		}
	}
}

/// Cooperative; jobs check it between units of work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}
}
