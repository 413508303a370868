// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Multi-query search handler.

use axum::{
	extract::{RawQuery, State},
	Json,
};
use trawl_aggregate::SearchHit;

use crate::{api::AppState, error::ServerError};

/// Parsed `?keyword=..&keyword=..&count=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
	pub keywords: Vec<String>,
	pub count: u32,
}

impl SearchParams {
	/// `keyword` may repeat (also accepted as `keyword[]`); blank keywords are
	/// dropped. The first `count` wins and must be a non-negative integer.
	pub fn parse(raw: &str, default_count: u32) -> Result<Self, ServerError> {
		let mut keywords = Vec::new();
		let mut count = None;

		for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
			match key.as_ref() {
				"keyword" | "keyword[]" => {
					let keyword = value.trim();
					if !keyword.is_empty() {
						keywords.push(keyword.to_string());
					}
				}
				"count" if count.is_none() => {
					let parsed = value.trim().parse::<u32>().map_err(|_| {
						ServerError::BadRequest(format!("count must be a non-negative integer, got '{value}'"))
					})?;
					count = Some(parsed);
				}
				_ => {}
			}
		}

		Ok(Self {
			keywords,
			count: count.unwrap_or(default_count),
		})
	}
}

/// GET /search - aggregate results for every keyword, deduplicated by site.
pub async fn search(
	State(state): State<AppState>,
	RawQuery(raw): RawQuery,
) -> Result<Json<Vec<SearchHit>>, ServerError> {
	let params = SearchParams::parse(raw.as_deref().unwrap_or(""), state.default_count)?;

	tracing::info!(
		keywords = ?params.keywords,
		count = params.count,
		"search"
	);

	if params.keywords.is_empty() {
		return Ok(Json(Vec::new()));
	}

	let hits = state.search.search(&params.keywords, params.count).await;
	tracing::debug!(hits = hits.len(), "search finished");
	Ok(Json(hits))
}
