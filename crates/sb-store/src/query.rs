//! URL lookups against the mirrored lists.

use log::debug;

use sb_core::{canonicalize, fingerprint, CandidateForms, CanonicalUrl, ListType};

use crate::store::{BlacklistStore, StoreError};

/// Answers "is this URL active on this list?".
///
/// Owns its store, so dropping the engine releases the connection.
pub struct QueryEngine<S> {
    store: S,
}

impl<S: BlacklistStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Check a raw URL against one list.
    ///
    /// A URL that cannot be canonicalized is reported as not active rather
    /// than as an error.
    pub fn is_active(&self, url: &str, list: ListType) -> Result<bool, StoreError> {
        match canonicalize(url) {
            Ok(canonical) => self.canonical_is_active(&canonical, list),
            Err(e) => {
                debug!("Treating '{}' as not listed: {}", url, e);
                Ok(false)
            }
        }
    }

    /// Every list the URL is active on, in `ListType::ALL` order.
    pub fn active_lists(&self, url: &str) -> Result<Vec<ListType>, StoreError> {
        let canonical = match canonicalize(url) {
            Ok(canonical) => canonical,
            Err(e) => {
                debug!("Treating '{}' as not listed: {}", url, e);
                return Ok(Vec::new());
            }
        };

        let mut lists = Vec::new();
        for list in ListType::ALL {
            if self.canonical_is_active(&canonical, list)? {
                lists.push(list);
            }
        }
        Ok(lists)
    }

    /// Stops at the first candidate with an active row.
    pub fn canonical_is_active(&self, canonical: &CanonicalUrl, list: ListType) -> Result<bool, StoreError> {
        for form in CandidateForms::new(canonical) {
            let hash = fingerprint(&form);
            if self.store.active_count(list, &hash)? > 0 {
                debug!("[{}] hit on '{}' ({})", list, form, hash);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
