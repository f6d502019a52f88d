//! In-process storage for the disabled-plugin list

use std::sync::RwLock;

use crate::domain::traits::DisabledListStore;

/// Disabled list kept in memory for the life of the process
///
/// Seeded from configuration at startup. Nothing is written back to disk;
/// a restart starts again from the configured value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            value: RwLock::new(initial),
        }
    }
}

impl DisabledListStore for MemoryStore {
    fn read(&self) -> Option<String> {
        match self.value.read() {
            Ok(v) => v.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, value: String) {
        match self.value.write() {
            Ok(mut v) => *v = Some(value),
            Err(poisoned) => *poisoned.into_inner() = Some(value),
        }
    }
}
