// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capped exponential backoff for upstream calls.
//!
//! Search calls spend quota on every attempt, so the default policy used by
//! the aggregation engine is a single attempt ([`RetryConfig::single_attempt`]).
//! Operators can opt into more attempts through configuration.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
	pub retryable_statuses: Vec<StatusCode>,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(250),
			max_delay: Duration::from_secs(4),
			backoff_factor: 2.0,
			jitter: true,
			retryable_statuses: vec![
				StatusCode::REQUEST_TIMEOUT,
				StatusCode::INTERNAL_SERVER_ERROR,
				StatusCode::BAD_GATEWAY,
				StatusCode::SERVICE_UNAVAILABLE,
				StatusCode::GATEWAY_TIMEOUT,
			],
		}
	}
}

impl RetryConfig {
	/// No retries at all; the first failure is returned.
	pub fn single_attempt() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}

	pub fn is_retryable_status(&self, status: StatusCode) -> bool {
		self.retryable_statuses.contains(&status)
	}

	fn delay_for(&self, attempt: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let seconds = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(seconds)
	}
}

/// Errors that know whether another attempt could succeed.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self
			.status()
			.map(|status| RetryConfig::default().is_retryable_status(status))
			.unwrap_or(false)
	}
}

/// Run `f` until it succeeds, fails with a non-retryable error, or
/// `cfg.max_attempts` is reached.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			debug!(error = ?err, attempt, "giving up on non-retryable error");
			return Err(err);
		}

		if attempt >= max_attempts {
			warn!(error = ?err, attempt, max_attempts, "retry attempts exhausted");
			return Err(err);
		}

		let delay = cfg.delay_for(attempt - 1);
		warn!(
			error = ?err,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			"retrying after transient error"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct Flaky {
		transient: bool,
	}

	impl RetryableError for Flaky {
		fn is_retryable(&self) -> bool {
			self.transient
		}
	}

	fn fast(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
			retryable_statuses: vec![],
		}
	}

	#[tokio::test]
	async fn permanent_error_is_returned_after_one_call() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<(), Flaky> = retry(&fast(5), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { transient: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transient_error_stops_at_max_attempts() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<(), Flaky> = retry(&fast(3), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { transient: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_once_the_upstream_does() {
		let calls = Arc::new(AtomicU32::new(0));

		let result: Result<u32, Flaky> = retry(&fast(5), || {
			let calls = Arc::clone(&calls);
			async move {
				let n = calls.fetch_add(1, Ordering::SeqCst);
				if n < 2 {
					Err(Flaky { transient: true })
				} else {
					Ok(n)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 2);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn single_attempt_never_retries() {
		let calls = Arc::new(AtomicU32::new(0));
		let cfg = RetryConfig::single_attempt();

		let result: Result<(), Flaky> = retry(&cfg, || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { transient: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn zero_attempts_still_calls_once() {
		let calls = Arc::new(AtomicU32::new(0));

		let _: Result<(), Flaky> = retry(&fast(0), || {
			let calls = Arc::clone(&calls);
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { transient: true })
			}
		})
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn delay_without_jitter_is_deterministic() {
		let cfg = fast(3);
		let delays: Vec<Duration> = (0..5).map(|_| cfg.delay_for(1)).collect();
		assert!(delays.windows(2).all(|w| w[0] == w[1]));
		assert_eq!(delays[0], Duration::from_millis(2));
	}

	#[test]
	fn delay_is_capped() {
		let cfg = RetryConfig {
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(2),
			backoff_factor: 10.0,
			jitter: true,
			..RetryConfig::default()
		};

		for attempt in 0..8 {
			assert!(cfg.delay_for(attempt) <= Duration::from_secs(3));
		}
	}

	#[test]
	fn with_max_attempts_floors_at_one() {
		assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
		assert_eq!(RetryConfig::default().with_max_attempts(4).max_attempts, 4);
	}

	#[test]
	fn too_many_requests_is_not_retryable_by_default() {
		let cfg = RetryConfig::default();
		assert!(!cfg.is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
		assert!(cfg.is_retryable_status(StatusCode::BAD_GATEWAY));
	}
}
