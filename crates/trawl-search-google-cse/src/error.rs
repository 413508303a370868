// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use trawl_common_http::RetryableError;

#[derive(Debug, Error)]
pub enum CseError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("request timed out")]
	Timeout,

	/// The credential's daily allotment (or per-minute rate) is spent.
	#[error("rate limit or quota exceeded")]
	RateLimited,

	/// Bad key, bad cx, or the key is not enabled for the API.
	#[error("credential rejected by upstream")]
	Unauthorized,

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("upstream error {status}: {message}")]
	ApiError { status: u16, message: String },
}

impl CseError {
	/// True when the failure is tied to the credential rather than the request.
	pub fn is_credential_failure(&self) -> bool {
		matches!(self, CseError::RateLimited | CseError::Unauthorized)
	}
}

impl RetryableError for CseError {
	fn is_retryable(&self) -> bool {
		match self {
			CseError::Network(e) => e.is_retryable(),
			CseError::Timeout => true,
			// Retrying a spent key only burns another call; rotate instead.
			CseError::RateLimited => false,
			CseError::Unauthorized => false,
			CseError::InvalidResponse(_) => false,
			CseError::ApiError { status, .. } => *status >= 500,
		}
	}
}
