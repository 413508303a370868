// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-query page walk.

use serde::Serialize;
use tracing::{debug, instrument, warn};
use trawl_credentials::{ConsumeOutcome, CredentialStore};

use crate::fetcher::{PageFetcher, PageRequest};
use crate::hit::SearchHit;
use crate::rotation::RotationCursor;

pub use trawl_search_google_cse::PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	/// The requested count was covered.
	BudgetSpent,
	/// Upstream returned a page with no items.
	EmptyPage,
	/// Upstream returned fewer than a full page.
	ShortPage,
	/// Every credential in the cursor is retired.
	NoCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
	pub query: String,
	/// Successful fetches; each spent one unit of quota.
	pub pages_fetched: u32,
	/// Fetches that failed and retired their credential.
	pub failed_fetches: u32,
	/// Normalized items emitted, before dedup.
	pub hits_seen: usize,
	pub stop: StopReason,
}

/// Drives one query's pages against a shared cursor.
#[derive(Debug)]
pub struct PaginationDriver<'a, F> {
	store: &'a CredentialStore,
	fetcher: &'a F,
}

impl<'a, F> PaginationDriver<'a, F>
where
	F: PageFetcher,
{
	pub fn new(store: &'a CredentialStore, fetcher: &'a F) -> Self {
		Self { store, fetcher }
	}

	/// Fetch pages for `query` until `target` results are covered, upstream
	/// runs dry, or no credential is left. Hits go to `sink` in page order.
	/// `target` is capped at the fetcher's [`PageFetcher::max_results`].
	///
	/// A quota unit is reserved before each fetch. A failed fetch zeroes the
	/// credential and retries the same offset with the next one.
	#[instrument(skip(self, cursor, sink))]
	pub async fn run<S>(
		&self,
		query: &str,
		target: u32,
		cursor: &mut RotationCursor,
		sink: &mut S,
	) -> QueryReport
	where
		S: Extend<SearchHit>,
	{
		let mut report = QueryReport {
			query: query.to_string(),
			pages_fetched: 0,
			failed_fetches: 0,
			hits_seen: 0,
			stop: StopReason::BudgetSpent,
		};
		let mut start: u32 = 1;
		let mut remaining = match self.fetcher.max_results() {
			Some(cap) => target.min(cap),
			None => target,
		};

		while remaining > 0 {
			let Some(candidate) = cursor.current().cloned() else {
				report.stop = StopReason::NoCredential;
				break;
			};

			match self.store.try_consume(&candidate.id).await {
				ConsumeOutcome::Consumed { remaining: left } => {
					debug!(credential = %candidate.id, quota_left = left, start, "quota reserved");
				}
				outcome => {
					debug!(credential = %candidate.id, ?outcome, "credential unusable, rotating");
					cursor.retire_current();
					continue;
				}
			}

			let request = PageRequest {
				query,
				start,
				api_key: &candidate.api_key,
				cx: &candidate.cx,
			};

			let page = match self.fetcher.fetch_page(request).await {
				Ok(page) => page,
				Err(e) => {
					warn!(credential = %candidate.id, start, error = %e, "page fetch failed, retiring credential");
					self.store.exhaust(&candidate.id).await;
					report.failed_fetches += 1;
					cursor.retire_current();
					continue;
				}
			};
			report.pages_fetched += 1;

			if page.items.is_empty() {
				report.stop = StopReason::EmptyPage;
				break;
			}

			let short = (page.items.len() as u32) < PAGE_SIZE;
			let hits: Vec<SearchHit> = page
				.items
				.into_iter()
				.filter_map(SearchHit::normalize)
				.collect();
			report.hits_seen += hits.len();
			sink.extend(hits);

			if short {
				report.stop = StopReason::ShortPage;
				break;
			}

			let step = remaining.min(PAGE_SIZE);
			start += step;
			remaining -= step;
		}

		debug!(
			pages = report.pages_fetched,
			failed = report.failed_fetches,
			hits = report.hits_seen,
			stop = ?report.stop,
			"query finished"
		);
		report
	}
}
