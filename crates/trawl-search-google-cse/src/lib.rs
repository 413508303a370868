// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for the Google Programmable Search (Custom Search JSON) API.
//!
//! Unlike a single-shot search client, every call here fetches exactly one
//! page of ten results at a 1-based `start` offset, and the credential
//! (`key` + `cx`) travels with the request rather than the client. That lets
//! one client serve a whole rotating pool of credentials.

pub mod client;
pub mod error;
pub mod types;

pub use client::{CseClient, DEFAULT_BASE_URL, REQUEST_TIMEOUT};
pub use error::CseError;
pub use trawl_common_http::RetryConfig;
pub use types::{CsePage, CsePageRequest, CseResultItem, MAX_RESULTS, MAX_START, PAGE_SIZE};
