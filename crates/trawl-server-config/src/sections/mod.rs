// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod aggregate;
mod http;
mod jobs;
mod logging;
mod search;
mod store;

pub use aggregate::{AggregateConfig, AggregateConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use jobs::{JobsConfig, JobsConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use search::{SearchConfig, SearchConfigLayer};
pub use store::{StoreConfig, StoreConfigLayer};
