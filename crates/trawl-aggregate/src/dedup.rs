// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;

use crate::hit::SearchHit;

/// Insertion-ordered set of hits keyed by canonical site. First one wins.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
	order: Vec<SearchHit>,
	seen: HashSet<String>,
}

impl ResultSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns false (and drops `hit`) when its site is already present.
	pub fn merge(&mut self, hit: SearchHit) -> bool {
		if self.seen.contains(&hit.canonical) {
			return false;
		}
		self.seen.insert(hit.canonical.clone());
		self.order.push(hit);
		true
	}

	pub fn contains(&self, canonical: &str) -> bool {
		self.seen.contains(canonical)
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &SearchHit> {
		self.order.iter()
	}

	pub fn into_vec(self) -> Vec<SearchHit> {
		self.order
	}
}

impl Extend<SearchHit> for ResultSet {
	fn extend<I: IntoIterator<Item = SearchHit>>(&mut self, iter: I) {
		for hit in iter {
			self.merge(hit);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn hit(canonical: &str, url: &str) -> SearchHit {
		SearchHit {
			url: url.to_string(),
			title: String::new(),
			canonical: canonical.to_string(),
		}
	}

	#[test]
	fn later_duplicates_are_discarded() {
		let mut set = ResultSet::new();
		assert!(set.merge(hit("example.com", "https://example.com/first")));
		assert!(!set.merge(hit("example.com", "https://example.com/newer")));

		let hits = set.into_vec();
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].url, "https://example.com/first");
	}

	#[test]
	fn extend_merges_in_order() {
		let mut set = ResultSet::new();
		set.extend(vec![hit("b", "1"), hit("a", "2"), hit("b", "3"), hit("c", "4")]);
		let sites: Vec<_> = set.iter().map(|h| h.canonical.as_str()).collect();
		assert_eq!(sites, vec!["b", "a", "c"]);
		assert!(set.contains("a"));
	}

	proptest! {
		#[test]
		fn output_is_unique_and_first_seen(sites in proptest::collection::vec("[a-e]", 0..40)) {
			let mut set = ResultSet::new();
			for (i, site) in sites.iter().enumerate() {
				set.merge(hit(site, &i.to_string()));
			}

			let mut expected: Vec<(String, String)> = Vec::new();
			for (i, site) in sites.iter().enumerate() {
				if !expected.iter().any(|(s, _)| s == site) {
					expected.push((site.clone(), i.to_string()));
				}
			}

			let actual: Vec<(String, String)> = set
				.into_vec()
				.into_iter()
				.map(|h| (h.canonical, h.url))
				.collect();
			prop_assert_eq!(actual, expected);
		}
	}
}
