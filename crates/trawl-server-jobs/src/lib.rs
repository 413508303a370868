// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background job scheduler for the trawl server.
//!
//! Jobs run on a daily wall-clock schedule (UTC) or a fixed interval, can be
//! triggered by hand, retry with backoff when they report a retryable
//! failure, and keep a short in-memory run history for health reporting.

pub mod context;
pub mod error;
pub mod health;
pub mod history;
pub mod job;
pub mod scheduler;
pub mod types;

pub use context::{CancellationToken, JobContext};
pub use error::{JobError, Result};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use history::RunHistory;
pub use job::Job;
pub use scheduler::{until_next_daily, JobScheduler};
pub use types::{JobOutput, JobRun, JobStatus, Schedule, TriggerSource};
