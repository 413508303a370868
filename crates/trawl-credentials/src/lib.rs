// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential store for rate-limited search credentials.
//!
//! Records live in memory in insertion order and are the source of truth.
//! Every mutation marks the store dirty; a background [`WriteCoalescer`]
//! turns bursts of mutations into at most one write per flush interval and a
//! final write once mutations go quiet. A crash can lose at most that window.
//!
//! Quota spending goes through [`CredentialStore::try_consume`], an atomic
//! check-and-decrement, so concurrent aggregation calls can never overspend a
//! credential or lose each other's decrements.

pub mod backend;
pub mod coalescer;
pub mod error;
pub mod model;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, StoreBackend};
pub use coalescer::{CoalescerConfig, FlushTarget, WriteCoalescer};
pub use error::{Result, StoreError};
pub use model::{
	ConsumeOutcome, Credential, CredentialId, CredentialPatch, NewCredential, PersistedCredential,
	PersistedDocument,
};
pub use store::{CredentialStore, StoreConfig, DEFAULT_QUOTA};
