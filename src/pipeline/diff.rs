//! Seen-set diff for incremental polling.
//!
//! A run's canonical URLs are compared with every URL seen by earlier runs.
//! URLs are only ever added to the seen set, never removed.

use std::collections::HashSet;

/// Insertion-ordered set of canonical URLs.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a URL. Returns `false` if it was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl PartialEq for SeenSet {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for SeenSet {}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for SeenSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for url in iter {
            self.insert(url);
        }
    }
}

/// Outcome of comparing a run against the prior seen set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenDiff {
    /// URLs of this run absent from the prior set, deduplicated, in
    /// first-occurrence order
    pub new_urls: Vec<String>,
    /// Prior set plus every URL of this run
    pub updated_seen: SeenSet,
}

impl SeenDiff {
    pub fn has_new(&self) -> bool {
        !self.new_urls.is_empty()
    }
}

/// Compute the new URLs of a run and the seen set to persist afterwards.
pub fn diff_and_update<I, S>(current: I, prior: &SeenSet) -> SeenDiff
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut updated_seen = prior.clone();
    let mut new_urls = Vec::new();

    for url in current {
        let url = url.as_ref();
        if updated_seen.insert(url) {
            new_urls.push(url.to_string());
        }
    }

    SeenDiff {
        new_urls,
        updated_seen,
    }
}
