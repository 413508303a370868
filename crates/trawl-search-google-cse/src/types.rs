// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use trawl_common_secret::SecretString;

/// Results per upstream page. Fixed by the API.
pub const PAGE_SIZE: u32 = 10;

/// Largest 1-based offset the API accepts for a full page (`start + num <= 101`).
pub const MAX_START: u32 = 91;

/// Most results the API serves for one query.
pub const MAX_RESULTS: u32 = MAX_START + PAGE_SIZE - 1;

/// One page of one query, fetched with one credential.
#[derive(Debug, Clone)]
pub struct CsePageRequest {
	pub api_key: SecretString,
	pub cx: String,
	pub query: String,
	pub start: u32,
}

impl CsePageRequest {
	/// A `start` of 0 means the first page.
	pub fn new(
		api_key: SecretString,
		cx: impl Into<String>,
		query: impl Into<String>,
		start: u32,
	) -> Self {
		Self {
			api_key,
			cx: cx.into(),
			query: query.into(),
			start: start.max(1),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsePage {
	pub query: String,
	pub start: u32,
	pub items: Vec<CseResultItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CseResultItem {
	pub title: String,
	pub url: String,
	pub snippet: String,
	pub display_link: Option<String>,
	/// Absolute 1-based rank within the query (page offset included).
	pub rank: u32,
}
