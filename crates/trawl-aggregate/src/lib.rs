// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Quota-aware search aggregation across a pool of credentials.
//!
//! For each query the [`PaginationDriver`] walks upstream pages ten at a
//! time, spending one unit of quota per page from whichever credential the
//! [`RotationCursor`] currently points at. A credential that runs dry or
//! fails a fetch is retired for the rest of the call and the cursor moves on.
//! Hits from every page of every query are merged into a [`ResultSet`],
//! keyed by canonical site, first one wins.
//!
//! Upstream and quota failures never reach the caller of
//! [`Aggregator::aggregate`]; they degrade to fewer (or zero) results.

pub mod dedup;
pub mod fetcher;
pub mod hit;
pub mod orchestrator;
pub mod pagination;
pub mod rotation;

pub use dedup::ResultSet;
pub use fetcher::{Page, PageFetcher, PageItem, PageRequest};
pub use hit::SearchHit;
pub use orchestrator::{Aggregation, Aggregator};
pub use pagination::{PaginationDriver, QueryReport, StopReason, PAGE_SIZE};
pub use rotation::{Candidate, RotationCursor, RotationMode};
