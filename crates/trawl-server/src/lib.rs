// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface for trawl: multi-query search over a pool of rotating
//! credentials, credential management, and the daily quota reset job.

pub mod api;
pub mod error;
pub mod jobs;
pub mod routes;

pub use api::{create_router, AppState, SearchService};
pub use error::ServerError;
pub use trawl_server_config::ServerConfig;
