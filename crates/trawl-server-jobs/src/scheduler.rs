// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::context::{CancellationToken, JobContext};
use crate::error::{JobError, Result};
use crate::health::{HealthState, JobHealthStatus, JobsHealthStatus};
use crate::history::RunHistory;
use crate::job::Job;
use crate::types::{JobRun, JobStatus, Schedule, TriggerSource};

const BASE_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_FACTOR: f64 = 2.0;
const MAX_RETRIES: u32 = 3;

struct RegisteredJob {
	job: Arc<dyn Job>,
	schedule: Schedule,
	cancellation_token: CancellationToken,
}

pub struct JobScheduler {
	jobs: HashMap<String, RegisteredJob>,
	history: Arc<RunHistory>,
	shutdown_tx: broadcast::Sender<()>,
	handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for JobScheduler {
	fn default() -> Self {
		Self::new(Arc::new(RunHistory::default()))
	}
}

impl JobScheduler {
	pub fn new(history: Arc<RunHistory>) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			jobs: HashMap::new(),
			history,
			shutdown_tx,
			handles: Mutex::new(Vec::new()),
		}
	}

	/// Re-registering an id replaces the earlier job.
	pub fn register(&mut self, job: Arc<dyn Job>, schedule: Schedule) {
		let id = job.id().to_string();
		self.jobs.insert(
			id,
			RegisteredJob {
				job,
				schedule,
				cancellation_token: CancellationToken::new(),
			},
		);
	}

	pub fn register_daily(&mut self, job: Arc<dyn Job>, at: NaiveTime) {
		self.register(job, Schedule::DailyAt(at));
	}

	#[instrument(skip(self))]
	pub async fn start(&self) {
		let mut handles = self.handles.lock().await;

		for (job_id, registered) in &self.jobs {
			let job = Arc::clone(&registered.job);
			let history = Arc::clone(&self.history);
			let mut shutdown_rx = self.shutdown_tx.subscribe();
			let cancellation_token = registered.cancellation_token.clone();
			let schedule = registered.schedule;
			let job_id = job_id.clone();

			info!(job_id = %job_id, %schedule, "scheduling job");
			let handle = tokio::spawn(async move {
				loop {
					let wait = match schedule {
						Schedule::DailyAt(at) => until_next_daily(Utc::now(), at),
					};

					tokio::select! {
						_ = tokio::time::sleep(wait) => {
							if cancellation_token.is_cancelled() {
								continue;
							}
							match run_job_with_retry(
								&job,
								&history,
								TriggerSource::Schedule,
								&cancellation_token,
							)
							.await
							{
								Ok(run_id) => info!(job_id = %job_id, run_id = %run_id, "scheduled run finished"),
								Err(JobError::Cancelled) => {}
								Err(e) => error!(job_id = %job_id, error = %e, "scheduled run failed"),
							}
						}
						_ = shutdown_rx.recv() => {
							info!(job_id = %job_id, "shutting down scheduled job");
							break;
						}
					}
				}
			});

			handles.push(handle);
		}

		info!(job_count = handles.len(), "job scheduler started");
	}

	/// Run a job now, outside its schedule. Returns the run id.
	#[instrument(skip(self))]
	pub async fn trigger_job(&self, job_id: &str, triggered_by: TriggerSource) -> Result<String> {
		let registered = self
			.jobs
			.get(job_id)
			.ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

		run_job_with_retry(
			&registered.job,
			&self.history,
			triggered_by,
			&registered.cancellation_token,
		)
		.await
	}

	/// Cancels in-flight runs and waits for the schedule loops to exit.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		for registered in self.jobs.values() {
			registered.cancellation_token.cancel();
		}
		let _ = self.shutdown_tx.send(());

		let mut handles = self.handles.lock().await;
		for handle in handles.drain(..) {
			let _ = handle.await;
		}

		info!("job scheduler shut down");
	}

	pub fn job_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.jobs.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn history(&self) -> &Arc<RunHistory> {
		&self.history
	}

	pub async fn job_status(&self, job_id: &str) -> Option<JobHealthStatus> {
		let registered = self.jobs.get(job_id)?;

		let last_run = self.history.get_last_run(job_id).await;
		let consecutive_failures = self.history.count_consecutive_failures(job_id).await;

		Some(JobHealthStatus {
			job_id: job_id.to_string(),
			name: registered.job.name().to_string(),
			schedule: registered.schedule.to_string(),
			status: HealthState::from_run(last_run.as_ref(), consecutive_failures),
			last_run: last_run.map(Into::into),
			consecutive_failures,
		})
	}

	pub async fn health_status(&self) -> JobsHealthStatus {
		let mut jobs = Vec::new();
		for job_id in self.job_ids() {
			if let Some(status) = self.job_status(&job_id).await {
				jobs.push(status);
			}
		}

		let status = jobs
			.iter()
			.map(|j| j.status)
			.max()
			.unwrap_or(HealthState::Healthy);
		JobsHealthStatus { status, jobs }
	}
}

/// Time from `now` until the next occurrence of `at` (UTC). An occurrence
/// exactly at `now` counts as tomorrow's.
pub fn until_next_daily(now: DateTime<Utc>, at: NaiveTime) -> Duration {
	let today = now.date_naive().and_time(at).and_utc();
	let next = if today > now {
		today
	} else {
		today + chrono::Duration::days(1)
	};
	(next - now).to_std().unwrap_or(Duration::ZERO)
}

async fn run_job_with_retry(
	job: &Arc<dyn Job>,
	history: &RunHistory,
	triggered_by: TriggerSource,
	cancellation_token: &CancellationToken,
) -> Result<String> {
	let mut retry_count = 0u32;
	let run_id = uuid::Uuid::new_v4().to_string();

	history
		.record_run_start(&JobRun {
			id: run_id.clone(),
			job_id: job.id().to_string(),
			status: JobStatus::Running,
			started_at: Utc::now(),
			completed_at: None,
			duration_ms: None,
			error_message: None,
			retry_count,
			triggered_by,
			metadata: None,
		})
		.await;

	loop {
		let ctx = JobContext {
			run_id: run_id.clone(),
			triggered_by: if retry_count > 0 {
				TriggerSource::Retry
			} else {
				triggered_by
			},
			attempt: retry_count,
			cancellation_token: cancellation_token.clone(),
		};

		let outcome = if cancellation_token.is_cancelled() {
			Err(JobError::Cancelled)
		} else {
			job.run(&ctx).await
		};

		match outcome {
			Ok(output) => {
				history
					.record_run_complete(&run_id, JobStatus::Succeeded, None, output.metadata)
					.await;
				info!(job_id = %job.id(), run_id = %run_id, message = %output.message, "job completed");
				return Ok(run_id);
			}
			Err(JobError::Cancelled) => {
				history
					.record_run_complete(&run_id, JobStatus::Cancelled, None, None)
					.await;
				info!(job_id = %job.id(), run_id = %run_id, "job cancelled");
				return Err(JobError::Cancelled);
			}
			Err(JobError::Failed { message, retryable }) => {
				if retryable && retry_count < MAX_RETRIES {
					retry_count += 1;
					history.record_retry(&run_id, retry_count).await;
					let delay_secs = calculate_backoff_delay(retry_count);
					warn!(
						job_id = %job.id(),
						run_id = %run_id,
						retry_count,
						delay_secs,
						error = %message,
						"job failed, retrying"
					);
					tokio::time::sleep(Duration::from_secs(delay_secs)).await;
					continue;
				}

				history
					.record_run_complete(&run_id, JobStatus::Failed, Some(message.clone()), None)
					.await;
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "job failed");
				return Err(JobError::Failed { message, retryable });
			}
			Err(e) => {
				let message = e.to_string();
				history
					.record_run_complete(&run_id, JobStatus::Failed, Some(message.clone()), None)
					.await;
				warn!(job_id = %job.id(), run_id = %run_id, error = %message, "job failed with error");
				return Err(e);
			}
		}
	}
}

pub(crate) fn calculate_backoff_delay(retry_count: u32) -> u64 {
	let delay = BASE_RETRY_DELAY_SECS as f64 * RETRY_FACTOR.powi(retry_count as i32 - 1);
	(delay as u64).min(MAX_RETRY_DELAY_SECS)
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use async_trait::async_trait;
	use chrono::TimeZone;
	use proptest::prelude::*;

	use super::*;
	use crate::types::JobOutput;

	/// Fails with the given error for the first `failures` attempts.
	struct CountingJob {
		id: &'static str,
		runs: AtomicU32,
		failures: u32,
		retryable: bool,
	}

	impl CountingJob {
		fn ok(id: &'static str) -> Self {
			Self {
				id,
				runs: AtomicU32::new(0),
				failures: 0,
				retryable: false,
			}
		}

		fn flaky(id: &'static str, failures: u32, retryable: bool) -> Self {
			Self {
				failures,
				retryable,
				..Self::ok(id)
			}
		}

		fn runs(&self) -> u32 {
			self.runs.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Job for CountingJob {
		fn id(&self) -> &str {
			self.id
		}

		fn name(&self) -> &str {
			"Counting job"
		}

		fn description(&self) -> &str {
			"Counts its runs"
		}

		async fn run(&self, _ctx: &JobContext) -> std::result::Result<JobOutput, JobError> {
			let n = self.runs.fetch_add(1, Ordering::SeqCst);
			if n < self.failures {
				return Err(JobError::Failed {
					message: format!("attempt {n} failed"),
					retryable: self.retryable,
				});
			}
			Ok(JobOutput::new("done"))
		}
	}

	fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 3, 14, h, m, s).unwrap()
	}

	fn at(h: u32, m: u32) -> NaiveTime {
		NaiveTime::from_hms_opt(h, m, 0).unwrap()
	}

	#[test]
	fn backoff_doubles_and_caps() {
		assert_eq!(calculate_backoff_delay(1), 1);
		assert_eq!(calculate_backoff_delay(2), 2);
		assert_eq!(calculate_backoff_delay(3), 4);
		assert_eq!(calculate_backoff_delay(10), MAX_RETRY_DELAY_SECS);
	}

	#[test]
	fn next_daily_later_today() {
		assert_eq!(
			until_next_daily(utc(6, 30, 0), at(7, 0)),
			Duration::from_secs(30 * 60)
		);
	}

	#[test]
	fn next_daily_rolls_to_tomorrow() {
		assert_eq!(
			until_next_daily(utc(7, 0, 1), at(7, 0)),
			Duration::from_secs(24 * 3600 - 1)
		);
		assert_eq!(
			until_next_daily(utc(7, 0, 0), at(7, 0)),
			Duration::from_secs(24 * 3600)
		);
	}

	proptest! {
		#[test]
		fn next_daily_is_within_a_day(h in 0u32..24, m in 0u32..60, s in 0u32..60, th in 0u32..24, tm in 0u32..60) {
			let wait = until_next_daily(utc(h, m, s), at(th, tm));
			prop_assert!(wait > Duration::ZERO);
			prop_assert!(wait <= Duration::from_secs(24 * 3600));
		}
	}

	#[tokio::test]
	async fn trigger_unknown_job_is_not_found() {
		let scheduler = JobScheduler::default();
		let err = scheduler
			.trigger_job("nope", TriggerSource::Manual)
			.await
			.unwrap_err();
		assert!(matches!(err, JobError::NotFound(id) if id == "nope"));
	}

	#[tokio::test]
	async fn manual_trigger_records_success() {
		let job = Arc::new(CountingJob::ok("count"));
		let mut scheduler = JobScheduler::default();
		scheduler.register_daily(job.clone(), at(7, 0));

		let run_id = scheduler
			.trigger_job("count", TriggerSource::Manual)
			.await
			.unwrap();

		assert_eq!(job.runs(), 1);
		let last = scheduler.history().get_last_run("count").await.unwrap();
		assert_eq!(last.id, run_id);
		assert_eq!(last.status, JobStatus::Succeeded);
		assert_eq!(last.triggered_by, TriggerSource::Manual);
	}

	#[tokio::test(start_paused = true)]
	async fn retryable_failures_are_retried() {
		let job = Arc::new(CountingJob::flaky("flaky", 2, true));
		let mut scheduler = JobScheduler::default();
		scheduler.register_daily(job.clone(), at(7, 0));

		scheduler
			.trigger_job("flaky", TriggerSource::Manual)
			.await
			.unwrap();

		assert_eq!(job.runs(), 3);
		let last = scheduler.history().get_last_run("flaky").await.unwrap();
		assert_eq!(last.status, JobStatus::Succeeded);
		assert_eq!(last.retry_count, 2);
	}

	#[tokio::test]
	async fn permanent_failure_degrades_health() {
		let job = Arc::new(CountingJob::flaky("broken", u32::MAX, false));
		let mut scheduler = JobScheduler::default();
		scheduler.register_daily(job.clone(), at(7, 0));

		assert!(scheduler
			.trigger_job("broken", TriggerSource::Manual)
			.await
			.is_err());
		assert_eq!(job.runs(), 1);

		let health = scheduler.health_status().await;
		assert_eq!(health.status, HealthState::Degraded);
		assert_eq!(health.jobs[0].consecutive_failures, 1);
		assert_eq!(health.jobs[0].schedule, "daily at 07:00 UTC");
	}

	#[tokio::test(start_paused = true)]
	async fn daily_schedule_waits_for_its_time_and_stops_on_shutdown() {
		let job = Arc::new(CountingJob::ok("daily"));
		let mut scheduler = JobScheduler::default();
		let later = (Utc::now() + chrono::Duration::hours(2)).time();
		scheduler.register_daily(job.clone(), later);
		scheduler.start().await;

		tokio::time::sleep(Duration::from_secs(30 * 60)).await;
		assert_eq!(job.runs(), 0);

		scheduler.shutdown().await;
		tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
		assert_eq!(job.runs(), 0);
		assert!(scheduler.history().get_last_run("daily").await.is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn scheduled_failure_is_recorded_and_schedule_continues() {
		let job = Arc::new(CountingJob::flaky("nightly", 1, false));
		let mut scheduler = JobScheduler::default();
		// Wall clock stays put while tokio time is paused, so the job comes
		// due again one minute after each run.
		let soon = (Utc::now() + chrono::Duration::minutes(1)).time();
		scheduler.register_daily(job.clone(), soon);
		scheduler.start().await;

		tokio::time::sleep(Duration::from_secs(90)).await;
		assert_eq!(job.runs(), 1);
		let first = scheduler.history().get_last_run("nightly").await.unwrap();
		assert_eq!(first.status, JobStatus::Failed);
		assert_eq!(first.triggered_by, TriggerSource::Schedule);

		tokio::time::sleep(Duration::from_secs(60)).await;
		assert_eq!(job.runs(), 2);
		let second = scheduler.history().get_last_run("nightly").await.unwrap();
		assert_eq!(second.status, JobStatus::Succeeded);

		scheduler.shutdown().await;
	}

	#[tokio::test]
	async fn trigger_after_shutdown_is_cancelled() {
		let job = Arc::new(CountingJob::ok("late"));
		let mut scheduler = JobScheduler::default();
		scheduler.register_daily(job.clone(), at(7, 0));
		scheduler.shutdown().await;

		let err = scheduler
			.trigger_job("late", TriggerSource::Manual)
			.await
			.unwrap_err();
		assert!(matches!(err, JobError::Cancelled));
		assert_eq!(job.runs(), 0);
	}
}
