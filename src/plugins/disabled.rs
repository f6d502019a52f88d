//! Disabled-set resolution on top of the injected list store

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::traits::DisabledListStore;
use crate::infrastructure::config::split_list;

/// Parse a raw disabled-list value. Absent or blank means nothing disabled.
pub fn parse_disabled(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(split_list)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

/// Reads and rewrites the disabled set. Never caches: every call goes back
/// to the store.
#[derive(Clone)]
pub struct DisabledSetResolver {
    store: Arc<dyn DisabledListStore>,
}

impl DisabledSetResolver {
    pub fn new(store: Arc<dyn DisabledListStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self) -> BTreeSet<String> {
        parse_disabled(self.store.read().as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve().contains(name)
    }

    /// Add `name` to the stored list
    pub fn insert(&self, name: &str) {
        let mut set = self.resolve();
        if set.insert(name.to_string()) {
            self.persist(&set);
        }
    }

    /// Drop `name` from the stored list
    pub fn remove(&self, name: &str) {
        let mut set = self.resolve();
        if set.remove(name) {
            self.persist(&set);
        }
    }

    fn persist(&self, set: &BTreeSet<String>) {
        let value = set.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        self.store.write(value);
    }
}
