//! Lookup-form generation
//!
//! A blacklist entry may target a whole domain, a directory or a single
//! page, so one canonical URL expands into a small grid of host suffixes
//! crossed with path prefixes. Every cell must be checked independently.

use crate::url::CanonicalUrl;

/// Hosts with this many labels or more only yield suffixes from the last five.
const HOST_LABEL_LIMIT: usize = 6;
const HOST_SUFFIX_LABELS: usize = 5;

/// Path forms generated without / with a query string.
const MAX_PATHS: usize = 5;
const MAX_PATHS_WITH_QUERY: usize = 6;

// =============================================================================
// Host Forms
// =============================================================================

/// Exact host followed by its truncated suffixes.
///
/// For labels `[L0..Ln]` the suffixes start at label 1 (or at `len - 5` for
/// hosts with six or more labels) and stop before the last label alone.
pub fn host_forms(host: &str) -> Vec<String> {
    let mut hosts = vec![host.to_string()];

    let labels: Vec<&str> = host.split('.').collect();
    let stop = labels.len();
    let start = if stop < HOST_LABEL_LIMIT {
        1
    } else {
        stop - HOST_SUFFIX_LABELS
    };

    for i in start..stop.saturating_sub(1) {
        hosts.push(labels[i..stop].join("."));
    }

    hosts
}

// =============================================================================
// Path Forms
// =============================================================================

/// Exact path (with and without query), the root, then growing prefixes.
pub fn path_forms(path: &str, query: Option<&str>) -> Vec<String> {
    let mut paths: Vec<String> = Vec::with_capacity(MAX_PATHS_WITH_QUERY);

    if let Some(q) = query {
        paths.push(format!("{}?{}", path, q));
    }
    paths.push(path.to_string());
    if !paths.iter().any(|p| p == "/") {
        paths.push("/".to_string());
    }

    let max_count = if query.is_some() {
        MAX_PATHS_WITH_QUERY
    } else {
        MAX_PATHS
    };

    let mut prefix = String::from("/");
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if paths.len() >= max_count {
            break;
        }
        prefix.push_str(segment);
        // A segment with a dot looks like a file, so it gets no slash
        if !segment.contains('.') {
            prefix.push('/');
        }
        if !paths.contains(&prefix) {
            paths.push(prefix.clone());
        }
    }

    paths
}

// =============================================================================
// Candidates
// =============================================================================

/// Restartable iterator over `host + path` candidates, host-major.
#[derive(Debug, Clone)]
pub struct CandidateForms {
    hosts: Vec<String>,
    paths: Vec<String>,
    host_idx: usize,
    path_idx: usize,
}

impl CandidateForms {
    pub fn new(canonical: &CanonicalUrl) -> Self {
        Self {
            hosts: host_forms(canonical.host()),
            paths: path_forms(canonical.path(), canonical.query()),
            host_idx: 0,
            path_idx: 0,
        }
    }

    /// Total number of candidates, regardless of iteration progress.
    pub fn total(&self) -> usize {
        self.hosts.len() * self.paths.len()
    }

    /// Rewind to the first candidate.
    pub fn restart(&mut self) {
        self.host_idx = 0;
        self.path_idx = 0;
    }
}

impl Iterator for CandidateForms {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.paths.is_empty() {
            return None;
        }
        let host = self.hosts.get(self.host_idx)?;
        let item = format!("{}{}", host, self.paths[self.path_idx]);

        self.path_idx += 1;
        if self.path_idx == self.paths.len() {
            self.path_idx = 0;
            self.host_idx += 1;
        }

        Some(item)
    }
}

/// All candidates for a canonical URL, in lookup order.
pub fn candidate_forms(canonical: &CanonicalUrl) -> Vec<String> {
    CandidateForms::new(canonical).collect()
}
