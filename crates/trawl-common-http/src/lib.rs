// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP plumbing for trawl.
//!
//! - [`builder`] returns a `reqwest` client builder carrying the trawl User-Agent
//! - [`retry`] re-runs a fallible async operation with capped exponential backoff

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent};
pub use retry::{retry, RetryConfig, RetryableError};
