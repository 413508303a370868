// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};
use trawl_common_http::{retry, RetryConfig};

use crate::error::CseError;
use crate::types::{CsePage, CsePageRequest, CseResultItem, MAX_START};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared, credential-agnostic client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CseClient {
	http_client: Client,
	base_url: String,
	locale: Option<String>,
	retry_config: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct PageBody {
	items: Option<Vec<PageItem>>,
	error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct PageItem {
	#[serde(default)]
	title: String,
	#[serde(default)]
	link: String,
	snippet: Option<String>,
	#[serde(rename = "displayLink")]
	display_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	code: u16,
	message: String,
}

impl CseClient {
	pub fn new() -> Result<Self, CseError> {
		Self::with_timeout(REQUEST_TIMEOUT)
	}

	pub fn with_timeout(timeout: Duration) -> Result<Self, CseError> {
		let http_client = trawl_common_http::new_client_with_timeout(timeout)?;
		Ok(Self {
			http_client,
			base_url: DEFAULT_BASE_URL.to_string(),
			locale: None,
			retry_config: RetryConfig::single_attempt(),
		})
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	/// Sent as both `gl` and `hl`. Blank values are ignored.
	pub fn with_locale(mut self, locale: Option<String>) -> Self {
		self.locale = locale.filter(|l| !l.trim().is_empty());
		self
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Fetch one page. Missing `items` in the body is an empty page, not an error.
	/// Offsets past [`MAX_START`] are an empty page without a request.
	#[instrument(skip(self, request), fields(query = %request.query, start = request.start, cx = %request.cx))]
	pub async fn search_page(&self, request: &CsePageRequest) -> Result<CsePage, CseError> {
		if request.start > MAX_START {
			debug!(max_start = MAX_START, "offset past the last page upstream serves");
			return Ok(CsePage {
				query: request.query.clone(),
				start: request.start,
				items: Vec::new(),
			});
		}
		retry(&self.retry_config, || self.fetch_once(request)).await
	}

	fn page_url(&self, request: &CsePageRequest) -> Result<Url, CseError> {
		let mut url = Url::parse(&self.base_url)
			.map_err(|e| CseError::InvalidResponse(format!("invalid base URL: {e}")))?;

		{
			let mut pairs = url.query_pairs_mut();
			pairs
				.append_pair("key", request.api_key.expose())
				.append_pair("cx", &request.cx)
				.append_pair("q", &request.query)
				.append_pair("start", &request.start.to_string());
			if let Some(locale) = &self.locale {
				pairs.append_pair("gl", locale).append_pair("hl", locale);
			}
		}

		Ok(url)
	}

	async fn fetch_once(&self, request: &CsePageRequest) -> Result<CsePage, CseError> {
		let url = self.page_url(request)?;
		debug!(base_url = %self.base_url, "requesting search page");

		let response = self.http_client.get(url).send().await.map_err(|e| {
			if e.is_timeout() {
				warn!("search page request timed out");
				return CseError::Timeout;
			}
			warn!(error = %e, "network error fetching search page");
			CseError::Network(e)
		})?;

		let status = response.status();
		debug!(status = %status, "search page response");

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(classify_failure(status, body));
		}

		let body = response.text().await?;
		trace!(bytes = body.len(), "search page body");

		let parsed: PageBody = serde_json::from_str(&body).map_err(|e| {
			warn!(error = %e, "unparseable search page body");
			CseError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		if let Some(error) = parsed.error {
			warn!(code = error.code, message = %error.message, "upstream reported error in body");
			return Err(CseError::ApiError {
				status: error.code,
				message: error.message,
			});
		}

		let start = request.start;
		let items: Vec<CseResultItem> = parsed
			.items
			.unwrap_or_default()
			.into_iter()
			.enumerate()
			.map(|(index, item)| CseResultItem {
				title: item.title,
				url: item.link,
				snippet: item.snippet.unwrap_or_default(),
				display_link: item.display_link,
				rank: start + index as u32,
			})
			.collect();

		debug!(item_count = items.len(), "search page parsed");

		Ok(CsePage {
			query: request.query.clone(),
			start,
			items,
		})
	}
}

fn classify_failure(status: StatusCode, body: String) -> CseError {
	let code = status.as_u16();
	match code {
		429 => {
			warn!(status = code, "upstream rate limited the credential");
			CseError::RateLimited
		}
		401 | 403 => {
			let lowered = body.to_lowercase();
			if ["rate", "quota", "limit"].iter().any(|w| lowered.contains(w)) {
				warn!(status = code, "credential quota exceeded upstream");
				CseError::RateLimited
			} else {
				warn!(status = code, "credential rejected upstream");
				CseError::Unauthorized
			}
		}
		_ => {
			warn!(status = code, body = %body, "upstream returned error status");
			CseError::ApiError {
				status: code,
				message: body,
			}
		}
	}
}
