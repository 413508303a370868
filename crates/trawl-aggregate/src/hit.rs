// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetcher::PageItem;

/// One normalized search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
	pub url: String,
	pub title: String,
	/// Site identity used for dedup.
	pub canonical: String,
}

impl SearchHit {
	/// Canonical identity is the upstream display link, lower-cased. When that
	/// is missing or blank the URL's host stands in. Items with neither, or
	/// with no URL, are dropped.
	pub fn normalize(item: PageItem) -> Option<Self> {
		if item.url.trim().is_empty() {
			return None;
		}
		let canonical = item
			.display_link
			.as_deref()
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(str::to_lowercase)
			.or_else(|| host_of(&item.url))?;

		Some(Self {
			url: item.url,
			title: item.title,
			canonical,
		})
	}
}

fn host_of(url: &str) -> Option<String> {
	Url::parse(url)
		.ok()?
		.host_str()
		.filter(|h| !h.is_empty())
		.map(str::to_lowercase)
}
