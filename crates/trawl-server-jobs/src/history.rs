// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded in-memory record of job runs, newest last.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::types::{JobRun, JobStatus};

pub const DEFAULT_RUNS_PER_JOB: usize = 50;

#[derive(Debug)]
pub struct RunHistory {
	runs: RwLock<HashMap<String, VecDeque<JobRun>>>,
	capacity: usize,
}

impl Default for RunHistory {
	fn default() -> Self {
		Self::new(DEFAULT_RUNS_PER_JOB)
	}
}

impl RunHistory {
	pub fn new(runs_per_job: usize) -> Self {
		Self {
			runs: RwLock::new(HashMap::new()),
			capacity: runs_per_job.max(1),
		}
	}

	pub async fn record_run_start(&self, run: &JobRun) {
		let mut runs = self.runs.write().await;
		let entries = runs.entry(run.job_id.clone()).or_default();
		if entries.len() == self.capacity {
			entries.pop_front();
		}
		entries.push_back(run.clone());
	}

	/// Unknown or evicted run ids are ignored.
	pub async fn record_run_complete(
		&self,
		run_id: &str,
		status: JobStatus,
		error_message: Option<String>,
		metadata: Option<serde_json::Value>,
	) {
		let mut runs = self.runs.write().await;
		let Some(run) = runs
			.values_mut()
			.flat_map(|entries| entries.iter_mut())
			.find(|r| r.id == run_id)
		else {
			return;
		};

		let now = Utc::now();
		run.status = status;
		run.completed_at = Some(now);
		run.duration_ms = Some((now - run.started_at).num_milliseconds());
		run.error_message = error_message;
		run.metadata = metadata;
	}

	pub async fn record_retry(&self, run_id: &str, retry_count: u32) {
		let mut runs = self.runs.write().await;
		if let Some(run) = runs
			.values_mut()
			.flat_map(|entries| entries.iter_mut())
			.find(|r| r.id == run_id)
		{
			run.retry_count = retry_count;
		}
	}

	pub async fn get_last_run(&self, job_id: &str) -> Option<JobRun> {
		let runs = self.runs.read().await;
		runs.get(job_id).and_then(|entries| entries.back().cloned())
	}

	/// Failed runs since the most recent non-failed one.
	pub async fn count_consecutive_failures(&self, job_id: &str) -> u32 {
		let runs = self.runs.read().await;
		runs.get(job_id)
			.map(|entries| {
				entries
					.iter()
					.rev()
					.take_while(|r| r.status == JobStatus::Failed)
					.count() as u32
			})
			.unwrap_or(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::TriggerSource;

	fn started(id: &str) -> JobRun {
		JobRun {
			id: id.to_string(),
			job_id: "reset".to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count: 0,
			triggered_by: TriggerSource::Schedule,
			metadata: None,
		}
	}

	#[tokio::test]
	async fn completion_updates_the_run() {
		let history = RunHistory::default();
		history.record_run_start(&started("r1")).await;
		history
			.record_run_complete("r1", JobStatus::Failed, Some("boom".into()), None)
			.await;

		let last = history.get_last_run("reset").await.unwrap();
		assert_eq!(last.status, JobStatus::Failed);
		assert_eq!(last.error_message.as_deref(), Some("boom"));
		assert!(last.completed_at.is_some());
	}

	#[tokio::test]
	async fn consecutive_failures_stop_at_a_success() {
		let history = RunHistory::default();
		for (id, status) in [
			("r1", JobStatus::Failed),
			("r2", JobStatus::Succeeded),
			("r3", JobStatus::Failed),
			("r4", JobStatus::Failed),
		] {
			history.record_run_start(&started(id)).await;
			history.record_run_complete(id, status, None, None).await;
		}

		assert_eq!(history.count_consecutive_failures("reset").await, 2);
		assert_eq!(history.count_consecutive_failures("other").await, 0);
	}

	#[tokio::test]
	async fn oldest_runs_are_evicted() {
		let history = RunHistory::new(2);
		for id in ["r1", "r2", "r3"] {
			history.record_run_start(&started(id)).await;
		}

		let runs = history.runs.read().await;
		let ids: Vec<_> = runs["reset"].iter().map(|r| r.id.as_str()).collect();
		assert_eq!(ids, vec!["r2", "r3"]);
	}
}
