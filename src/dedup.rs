//! # Dedup Module
//!
//! Suppresses postings already emitted in earlier runs.
//!
//! Two identities are checked: the exact url and the fuzzy
//! `(title, company, location)` triple. Either one matching is enough to drop
//! a posting. The registry itself is only keyed by url; the fuzzy identity is
//! a filter-time heuristic.

use std::collections::{ HashMap, HashSet };

use tracing::debug;

use crate::posting::{ FuzzyKey, Posting };

/// Durable record of every posting emitted so far, unique on url.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenRegistry {
    rows: Vec<Posting>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        SeenRegistry::default()
    }

    /// Builds a registry, collapsing rows that share a url (last one wins).
    pub fn from_rows(rows: impl IntoIterator<Item = Posting>) -> Self {
        SeenRegistry {
            rows: merge_by_url(rows),
        }
    }

    pub fn rows(&self) -> &[Posting] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Posting> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.rows.iter().any(|row| row.exact_id() == Some(url))
    }
}

/// Why a posting was considered already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicate {
    Url,
    Fuzzy,
}

/// Membership sets over both identities.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    urls: HashSet<String>,
    fuzzy: HashSet<FuzzyKey>,
}

impl IdentityIndex {
    pub fn from_postings<'a>(postings: impl IntoIterator<Item = &'a Posting>) -> Self {
        let mut index = IdentityIndex::default();
        for posting in postings {
            index.insert(posting);
        }
        index
    }

    /// Records both identities of `posting`; absent identities are skipped.
    pub fn insert(&mut self, posting: &Posting) {
        if let Some(url) = posting.exact_id() {
            self.urls.insert(url.to_string());
        }
        if let Some(key) = posting.fuzzy_id() {
            self.fuzzy.insert(key);
        }
    }

    pub fn check(&self, posting: &Posting) -> Option<Duplicate> {
        if posting.exact_id().is_some_and(|url| self.urls.contains(url)) {
            return Some(Duplicate::Url);
        }
        if posting.fuzzy_id().is_some_and(|key| self.fuzzy.contains(&key)) {
            return Some(Duplicate::Fuzzy);
        }
        None
    }
}

/// Result of filtering a batch against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// Postings not seen before, in batch order.
    pub new: Vec<Posting>,
    /// Prior registry plus `new`.
    pub registry: SeenRegistry,
    /// Postings dropped as repeats of an earlier posting in the same batch.
    pub batch_duplicates: usize,
    /// Postings dropped because the registry already had them.
    pub registry_hits: usize,
}

/// Splits `batch` into new postings and returns the grown registry.
///
/// The batch is first de-duplicated against itself in order, first occurrence
/// winning, and the survivors are then checked against the registry.
pub fn filter_against_registry(batch: Vec<Posting>, registry: SeenRegistry) -> DedupOutcome {
    let mut in_batch = IdentityIndex::default();
    let mut unique = Vec::with_capacity(batch.len());
    let mut batch_duplicates = 0;

    for posting in batch {
        if let Some(kind) = in_batch.check(&posting) {
            debug!(url = ?posting.url, ?kind, "dropping duplicate within batch");
            batch_duplicates += 1;
            continue;
        }
        in_batch.insert(&posting);
        unique.push(posting);
    }

    let seen = IdentityIndex::from_postings(registry.rows());
    let mut new = Vec::with_capacity(unique.len());
    let mut registry_hits = 0;

    for posting in unique {
        if let Some(kind) = seen.check(&posting) {
            debug!(url = ?posting.url, ?kind, "dropping posting already in registry");
            registry_hits += 1;
            continue;
        }
        new.push(posting);
    }

    // A posting with neither identity can never match again, so it is not remembered.
    let remembered = new
        .iter()
        .filter(|posting| has_identity(posting))
        .cloned();
    let registry = SeenRegistry::from_rows(registry.into_rows().into_iter().chain(remembered));

    DedupOutcome {
        new,
        registry,
        batch_duplicates,
        registry_hits,
    }
}

fn has_identity(posting: &Posting) -> bool {
    posting.exact_id().is_some() || posting.fuzzy_id().is_some()
}

/// Collapses rows sharing a url: the first position is kept, the last value wins.
///
/// Rows without a url are all kept.
pub fn merge_by_url(rows: impl IntoIterator<Item = Posting>) -> Vec<Posting> {
    let mut merged: Vec<Posting> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match row.exact_id().map(str::to_string) {
            Some(url) =>
                match positions.get(&url) {
                    Some(&at) => {
                        merged[at] = row;
                    }
                    None => {
                        positions.insert(url, merged.len());
                        merged.push(row);
                    }
                }
            None => merged.push(row),
        }
    }

    merged
}
