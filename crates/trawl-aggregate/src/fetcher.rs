// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The seam between aggregation and the upstream search API.

use async_trait::async_trait;
use trawl_common_secret::SecretString;
use trawl_search_google_cse::{CseClient, CseError, CsePageRequest, MAX_RESULTS};

/// One page request, borrowed from the driver's state.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
	pub query: &'a str,
	/// 1-based offset of the first result on the page.
	pub start: u32,
	pub api_key: &'a SecretString,
	pub cx: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
	pub items: Vec<PageItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageItem {
	pub url: String,
	pub title: String,
	pub display_link: Option<String>,
}

/// Fetches one page of results with one credential.
///
/// Any `Err` retires the credential that was used.
#[async_trait]
pub trait PageFetcher: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Page, Self::Error>;

	/// Most results upstream will ever serve for one query, if it has a limit.
	fn max_results(&self) -> Option<u32> {
		None
	}
}

#[async_trait]
impl PageFetcher for CseClient {
	type Error = CseError;

	fn max_results(&self) -> Option<u32> {
		Some(MAX_RESULTS)
	}

	async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Page, CseError> {
		let request = CsePageRequest::new(
			request.api_key.clone(),
			request.cx,
			request.query,
			request.start,
		);
		let page = self.search_page(&request).await?;

		Ok(Page {
			items: page
				.items
				.into_iter()
				.map(|item| PageItem {
					url: item.url,
					title: item.title,
					display_link: item.display_link,
				})
				.collect(),
		})
	}
}

#[async_trait]
impl<T> PageFetcher for std::sync::Arc<T>
where
	T: PageFetcher + ?Sized,
{
	type Error = T::Error;

	async fn fetch_page(&self, request: PageRequest<'_>) -> Result<Page, Self::Error> {
		(**self).fetch_page(request).await
	}

	fn max_results(&self) -> Option<u32> {
		(**self).max_results()
	}
}
