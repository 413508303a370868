// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use trawl_server_jobs::{HealthState, JobsHealthStatus};

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthState,
	pub version: &'static str,
	pub credentials: CredentialsHealth,
	pub jobs: JobsHealthStatus,
}

#[derive(Debug, Serialize)]
pub struct CredentialsHealth {
	pub total: usize,
	/// Credentials with quota left.
	pub active: usize,
	pub pending_write: bool,
}

/// GET /health
///
/// Degraded when no credential has quota left; unhealthy (503) only when a
/// job is failing repeatedly.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let credentials = CredentialsHealth {
		total: state.store.len().await,
		active: state.store.active_count().await,
		pending_write: state.store.is_dirty(),
	};
	let jobs = state.scheduler.health_status().await;

	let pool_state = if credentials.active == 0 {
		HealthState::Degraded
	} else {
		HealthState::Healthy
	};
	let status = pool_state.max(jobs.status);

	let code = if status == HealthState::Unhealthy {
		StatusCode::SERVICE_UNAVAILABLE
	} else {
		StatusCode::OK
	};

	(
		code,
		Json(HealthResponse {
			status,
			version: env!("CARGO_PKG_VERSION"),
			credentials,
			jobs,
		}),
	)
}
