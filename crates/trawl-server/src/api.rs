// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
	routing::{get, post},
	Router,
};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use trawl_aggregate::{Aggregator, PageFetcher, SearchHit};
use trawl_credentials::CredentialStore;
use trawl_server_jobs::JobScheduler;

use crate::routes;

/// What the search route needs from the aggregation core.
#[async_trait]
pub trait SearchService: Send + Sync {
	async fn search(&self, queries: &[String], per_query_count: u32) -> Vec<SearchHit>;
}

#[async_trait]
impl<F> SearchService for Aggregator<F>
where
	F: PageFetcher,
{
	async fn search(&self, queries: &[String], per_query_count: u32) -> Vec<SearchHit> {
		self.aggregate(queries, per_query_count).await
	}
}

#[derive(Clone)]
pub struct AppState {
	pub store: CredentialStore,
	pub search: Arc<dyn SearchService>,
	pub scheduler: Arc<JobScheduler>,
	/// Per-query count used when a search request gives none.
	pub default_count: u32,
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/search", get(routes::search::search))
		.route("/apikeys", get(routes::credentials::list_credentials))
		.route(
			"/apikey",
			post(routes::credentials::create_credential).delete(routes::credentials::delete_credential),
		)
		.route("/health", get(routes::health::health_check))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		)
}
