// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;
use tracing::{info, instrument};
use trawl_credentials::CredentialStore;

use crate::dedup::ResultSet;
use crate::fetcher::PageFetcher;
use crate::hit::SearchHit;
use crate::pagination::{PaginationDriver, QueryReport};
use crate::rotation::{RotationCursor, RotationMode};

/// Hits plus a per-query account of how they were obtained.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
	pub hits: Vec<SearchHit>,
	pub reports: Vec<QueryReport>,
}

#[derive(Debug, Clone)]
pub struct Aggregator<F> {
	store: CredentialStore,
	fetcher: F,
	mode: RotationMode,
}

impl<F> Aggregator<F>
where
	F: PageFetcher,
{
	pub fn new(store: CredentialStore, fetcher: F) -> Self {
		Self {
			store,
			fetcher,
			mode: RotationMode::default(),
		}
	}

	pub fn with_rotation(mut self, mode: RotationMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn rotation(&self) -> RotationMode {
		self.mode
	}

	pub fn store(&self) -> &CredentialStore {
		&self.store
	}

	/// Deduplicated hits for `queries`, in first-seen order.
	pub async fn aggregate(&self, queries: &[String], per_query_count: u32) -> Vec<SearchHit> {
		self.aggregate_with_report(queries, per_query_count).await.hits
	}

	/// Queries run strictly in order, pages strictly in sequence. Never fails:
	/// a spent or broken pool just means fewer hits.
	#[instrument(skip(self, queries), fields(queries = queries.len(), rotation = %self.mode))]
	pub async fn aggregate_with_report(&self, queries: &[String], per_query_count: u32) -> Aggregation {
		let mut cursor = RotationCursor::from_store(&self.store).await;
		if cursor.is_exhausted() {
			info!("no credential has quota left");
			return Aggregation::default();
		}

		let driver = PaginationDriver::new(&self.store, &self.fetcher);
		let mut results = ResultSet::new();
		let mut reports = Vec::with_capacity(queries.len());

		for (index, query) in queries.iter().enumerate() {
			if self.mode == RotationMode::Refresh && index > 0 {
				cursor = RotationCursor::from_store(&self.store).await;
			}
			if cursor.is_exhausted() {
				info!(
					processed = index,
					skipped = queries.len() - index,
					"credential pool spent, stopping"
				);
				break;
			}

			let report = driver
				.run(query, per_query_count, &mut cursor, &mut results)
				.await;
			reports.push(report);
		}

		let hits = results.into_vec();
		info!(
			hits = hits.len(),
			pages = reports.iter().map(|r| r.pages_fetched).sum::<u32>(),
			"aggregation finished"
		);
		Aggregation { hits, reports }
	}
}
