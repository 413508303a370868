// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;
use trawl_credentials::CredentialStore;
use trawl_server_jobs::{Job, JobContext, JobError, JobOutput};

pub const QUOTA_RESET_JOB_ID: &str = "quota-reset";

/// Gives every credential its full daily quota back.
pub struct QuotaResetJob {
	store: CredentialStore,
}

impl QuotaResetJob {
	pub fn new(store: CredentialStore) -> Self {
		Self { store }
	}
}

#[async_trait]
impl Job for QuotaResetJob {
	fn id(&self) -> &str {
		QUOTA_RESET_JOB_ID
	}

	fn name(&self) -> &str {
		"Daily Quota Reset"
	}

	fn description(&self) -> &str {
		"Restore every credential to the default daily quota"
	}

	#[instrument(skip(self, ctx), fields(job_id = QUOTA_RESET_JOB_ID, run_id = %ctx.run_id))]
	async fn run(&self, ctx: &JobContext) -> Result<JobOutput, JobError> {
		if ctx.cancellation_token.is_cancelled() {
			return Err(JobError::Cancelled);
		}

		let quota = self.store.default_quota();
		let touched = self.store.reset_all(quota, Utc::now()).await;

		Ok(JobOutput::new(format!("Reset {touched} credentials to {quota}"))
			.with_metadata(serde_json::json!({ "reset_count": touched, "quota": quota })))
	}
}
