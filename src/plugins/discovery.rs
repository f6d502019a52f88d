//! Plugin discovery - the fixed set of plugins shipped with this build

use std::collections::BTreeMap;

use super::trait_def::PluginConstructor;
use super::{pomodoro, trello};

/// A plugin known to the build, not yet instantiated
#[derive(Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub constructor: Option<PluginConstructor>,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, constructor: PluginConstructor) -> Self {
        Self {
            name: name.into(),
            constructor: Some(constructor),
        }
    }

    /// A plugin that ships without anything to construct
    pub fn without_constructor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
        }
    }

    pub fn is_instantiable(&self) -> bool {
        self.constructor.is_some()
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Enumerates plugins without constructing any of them
#[derive(Debug, Clone)]
pub struct PluginDiscovery {
    descriptors: Vec<PluginDescriptor>,
}

impl PluginDiscovery {
    pub fn new(descriptors: Vec<PluginDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Plugins compiled into this binary
    pub fn builtin() -> Self {
        Self::new(vec![
            pomodoro::descriptor(),
            trello::descriptor(),
        ])
    }

    /// Every known plugin keyed by name. The first descriptor wins a
    /// duplicated name.
    pub fn discover(&self) -> BTreeMap<String, PluginDescriptor> {
        let mut found = BTreeMap::new();
        for descriptor in &self.descriptors {
            if found.contains_key(&descriptor.name) {
                tracing::warn!("Plugin {} is declared twice, keeping the first", descriptor.name);
                continue;
            }
            if !descriptor.is_instantiable() {
                tracing::warn!("Plugin {} has no constructor and cannot be enabled", descriptor.name);
            }
            found.insert(descriptor.name.clone(), descriptor.clone());
        }
        found
    }
}

impl Default for PluginDiscovery {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_lists_bundled_plugins() {
        let found = PluginDiscovery::builtin().discover();
        let names: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["pomodoro", "trello"]);
        assert!(found.values().all(PluginDescriptor::is_instantiable));
    }

    #[test]
    fn discovery_is_repeatable() {
        let discovery = PluginDiscovery::builtin();
        let first: Vec<String> = discovery.discover().into_keys().collect();
        let second: Vec<String> = discovery.discover().into_keys().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn descriptors_without_constructor_are_still_listed() {
        let discovery = PluginDiscovery::new(vec![
            PluginDescriptor::without_constructor("hollow"),
            PluginDescriptor::without_constructor("hollow"),
        ]);
        let found = discovery.discover();
        assert_eq!(found.len(), 1);
        assert!(!found["hollow"].is_instantiable());
    }
}
