//! Plugin registry - owns plugin instances and their enable/disable lifecycle

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::application::errors::PluginError;
use crate::application::messaging::CommandSurface;
use crate::domain::traits::DisabledListStore;
use crate::infrastructure::config::Config;
use super::disabled::DisabledSetResolver;
use super::discovery::{PluginDescriptor, PluginDiscovery};
use super::trait_def::{Plugin, PluginResult};

/// Manages all plugins for the bot
///
/// Every discovered plugin is either live in `plugins` or disabled, never
/// both. Names in the disabled store are never instantiated, and a plugin
/// that fails to initialize is reported as disabled.
///
/// All views iterate in plugin-name order. Command names are assumed to be
/// unique across plugins; when two enabled plugins describe the same
/// command, `command_descriptions` keeps the one from the plugin that sorts
/// last and logs a warning.
pub struct PluginRegistry {
    surface: CommandSurface,
    config: Arc<Config>,
    catalog: BTreeMap<String, PluginDescriptor>,
    disabled: DisabledSetResolver,
    plugins: BTreeMap<String, Box<dyn Plugin>>,
}

/// Shared handle used by the bot's own commands
pub type SharedPluginRegistry = Arc<RwLock<PluginRegistry>>;

impl PluginRegistry {
    /// Discover plugins and instantiate every one that is not disabled.
    /// Plugins that fail to initialize are logged and left out.
    pub fn construct(
        surface: CommandSurface,
        discovery: &PluginDiscovery,
        store: Arc<dyn DisabledListStore>,
        config: Arc<Config>,
    ) -> Self {
        let mut registry = Self {
            surface,
            config,
            catalog: discovery.discover(),
            disabled: DisabledSetResolver::new(store),
            plugins: BTreeMap::new(),
        };

        let disabled = registry.disabled.resolve();
        for name in disabled.iter().filter(|n| !registry.catalog.contains_key(*n)) {
            warn!("Disabled plugin {} is not part of this build", name);
        }

        let names: Vec<String> = registry.catalog.keys().cloned().collect();
        for name in names {
            if disabled.contains(&name) {
                info!("Plugin {} is disabled", name);
                continue;
            }
            match registry.instantiate(&name) {
                Ok(plugin) => registry.insert(&name, plugin),
                Err(e) => warn!("{}", e),
            }
        }

        info!(
            "Plugin registry ready: {} enabled, {} disabled",
            registry.plugins.len(),
            registry.catalog.len() - registry.plugins.len()
        );
        registry
    }

    pub fn into_shared(self) -> SharedPluginRegistry {
        Arc::new(RwLock::new(self))
    }

    fn instantiate(&self, name: &str) -> PluginResult<Box<dyn Plugin>> {
        let descriptor = self.catalog.get(name)
            .ok_or_else(|| PluginError::Unknown(name.to_string()))?;
        let constructor = descriptor.constructor
            .ok_or_else(|| PluginError::initialization(name, "no plugin constructor found"))?;

        let before = self.surface.snapshot();
        let result = constructor(&self.surface, &self.config);
        if result.is_err() {
            self.unbind_since(before);
        }
        result
    }

    /// Revoke every binding added after `before` was taken
    fn unbind_since(&self, before: Vec<(String, String)>) {
        let mut existing: BTreeMap<(String, String), usize> = BTreeMap::new();
        for binding in before {
            *existing.entry(binding).or_default() += 1;
        }

        for (command, owner) in self.surface.snapshot() {
            match existing.get_mut(&(command.clone(), owner.clone())) {
                Some(count) if *count > 0 => *count -= 1,
                _ => {
                    warn!("Unbinding /{} left behind by {}", command, owner);
                    if let Err(e) = self.surface.remove(&owner, &command) {
                        warn!("{}", e);
                    }
                }
            }
        }
    }

    /// Live instances are keyed by their catalog name, whatever they call themselves
    fn insert(&mut self, name: &str, plugin: Box<dyn Plugin>) {
        if plugin.name() != name {
            warn!("Plugin {} reports its name as {}", name, plugin.name());
        }
        info!("Plugin {} v{} enabled", name, plugin.version());
        self.plugins.insert(name.to_string(), plugin);
    }

    /// Enable a disabled plugin and bind its commands
    pub fn enable(&mut self, name: &str) -> PluginResult<()> {
        if !self.catalog.contains_key(name) {
            return Err(PluginError::Unknown(name.to_string()));
        }
        if self.plugins.contains_key(name) {
            return Err(PluginError::NotDisabled(name.to_string()));
        }

        let was_listed = self.disabled.contains(name);
        self.disabled.remove(name);
        if self.disabled.contains(name) {
            return Err(PluginError::Internal(format!("Plugin {} is still listed as disabled", name)));
        }

        match self.instantiate(name) {
            Ok(plugin) => {
                self.insert(name, plugin);
                Ok(())
            }
            Err(e) => {
                // Leave the store as it was
                if was_listed {
                    self.disabled.insert(name);
                }
                warn!("{}", e);
                Err(e)
            }
        }
    }

    /// Disable an enabled plugin and revoke its commands
    pub fn disable(&mut self, name: &str) -> PluginResult<()> {
        if !self.catalog.contains_key(name) {
            return Err(PluginError::Unknown(name.to_string()));
        }
        let plugin = self.plugins.remove(name)
            .ok_or_else(|| PluginError::NotEnabled(name.to_string()))?;

        let teardown = plugin.teardown(&self.surface);
        self.disabled.insert(name);
        info!("Plugin {} disabled", name);
        teardown
    }

    pub fn is_discovered(&self, name: &str) -> bool {
        self.catalog.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Every plugin in this build, sorted
    pub fn discovered_names(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    /// Live plugins, sorted
    pub fn enabled_names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Discovered plugins that are not live, sorted
    pub fn disabled_names(&self) -> Vec<String> {
        self.catalog
            .keys()
            .filter(|name| !self.plugins.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Current contents of the disabled store, as resolved right now
    pub fn configured_disabled(&self) -> BTreeSet<String> {
        self.disabled.resolve()
    }

    /// One entry per enabled plugin that has a feature description
    pub fn feature_descriptions(&self) -> Vec<String> {
        self.plugins
            .values()
            .filter_map(|p| p.feature_description().map(str::to_string))
            .collect()
    }

    /// Command help merged across enabled plugins
    pub fn command_descriptions(&self) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        let mut owners: BTreeMap<String, String> = BTreeMap::new();
        for (plugin_name, plugin) in &self.plugins {
            for (command, desc) in plugin.command_descriptions() {
                if let Some(previous) = owners.insert(command.clone(), plugin_name.clone()) {
                    warn!(
                        "Command /{} is described by both {} and {}, using {}",
                        command, previous, plugin_name, plugin_name
                    );
                }
                merged.insert(command, desc);
            }
        }
        merged
    }

    /// Get a live plugin by name
    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    pub fn surface(&self) -> &CommandSurface {
        &self.surface
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Command;
    use crate::infrastructure::storage::MemoryStore;
    use crate::plugins::trait_def::PluginCommands;

    struct Dummy {
        name: &'static str,
        feature: Option<&'static str>,
        commands: PluginCommands,
    }

    impl Plugin for Dummy {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "0.0.1"
        }

        fn feature_description(&self) -> Option<&str> {
            self.feature
        }

        fn commands(&self) -> &PluginCommands {
            &self.commands
        }
    }

    fn build(
        surface: &CommandSurface,
        name: &'static str,
        feature: Option<&'static str>,
        cmds: &[(&str, Option<&str>)],
    ) -> PluginResult<Box<dyn Plugin>> {
        let mut commands = PluginCommands::new(name);
        for (cmd, desc) in cmds {
            let mut command = Command::new(*cmd).with_handler(|_ctx| async { Ok(None) });
            if let Some(desc) = desc {
                command = command.with_description(*desc);
            }
            commands.register(surface, command)?;
        }
        Ok(Box::new(Dummy { name, feature, commands }))
    }

    fn alpha(surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        build(surface, "alpha", Some("Alpha things"), &[("a1", Some("First")), ("shared", Some("From alpha"))])
    }

    fn beta(surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        build(surface, "beta", None, &[("b1", None), ("shared", Some("From beta"))])
    }

    fn broken(_surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        Err(PluginError::initialization("broken", "missing credentials"))
    }

    fn half(surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        let mut commands = PluginCommands::new("half");
        commands.register(surface, Command::new("leak").with_handler(|_ctx| async { Ok(None) }))?;
        // Binds under a name it does not own, then gives up
        surface.add("stray", Command::new("a1"))
            .map_err(|e| PluginError::Internal(e.to_string()))?;
        Err(PluginError::initialization("half", "gave up halfway"))
    }

    fn mislabeled(surface: &CommandSurface, _config: &Config) -> PluginResult<Box<dyn Plugin>> {
        build(surface, "other", Some("Other things"), &[("x", None)])
    }

    fn registry(disabled: Option<&str>) -> (CommandSurface, Arc<MemoryStore>, PluginRegistry) {
        with_catalog(disabled, vec![
            PluginDescriptor::new("beta", beta),
            PluginDescriptor::new("alpha", alpha),
            PluginDescriptor::new("broken", broken),
            PluginDescriptor::without_constructor("hollow"),
        ])
    }

    fn with_catalog(
        disabled: Option<&str>,
        descriptors: Vec<PluginDescriptor>,
    ) -> (CommandSurface, Arc<MemoryStore>, PluginRegistry) {
        let surface = CommandSurface::new();
        let store = Arc::new(MemoryStore::new(disabled.map(str::to_string)));
        let discovery = PluginDiscovery::new(descriptors);
        let registry = PluginRegistry::construct(
            surface.clone(),
            &discovery,
            store.clone(),
            Arc::new(Config::default()),
        );
        (surface, store, registry)
    }

    fn assert_partition(registry: &PluginRegistry) {
        let enabled: BTreeSet<String> = registry.enabled_names().into_iter().collect();
        let disabled: BTreeSet<String> = registry.disabled_names().into_iter().collect();
        assert!(enabled.is_disjoint(&disabled));
        let all: Vec<String> = enabled.union(&disabled).cloned().collect();
        assert_eq!(all, registry.discovered_names());
        for name in &enabled {
            assert!(!registry.configured_disabled().contains(name));
        }
    }

    #[test]
    fn failed_plugins_are_contained() {
        let (_, _, registry) = registry(None);
        assert_eq!(registry.enabled_names(), vec!["alpha", "beta"]);
        assert_eq!(registry.disabled_names(), vec!["broken", "hollow"]);
        assert_partition(&registry);
    }

    #[test]
    fn views_follow_name_order() {
        let (_, _, registry) = registry(None);
        assert_eq!(registry.feature_descriptions(), vec!["Alpha things"]);

        let descs = registry.command_descriptions();
        assert_eq!(descs.keys().collect::<Vec<_>>(), vec!["a1", "b1", "shared"]);
        assert_eq!(descs["b1"], "Undefined command");
        // beta sorts after alpha
        assert_eq!(descs["shared"], "From beta");
        assert_eq!(registry.command_descriptions(), descs);
    }

    #[test]
    fn enable_then_disable_restores_surface() {
        let (surface, store, mut registry) = registry(Some("beta"));
        let before = surface.snapshot();
        assert_eq!(surface.owner_of("shared").as_deref(), Some("alpha"));

        registry.enable("beta").unwrap();
        assert_eq!(surface.owner_of("shared").as_deref(), Some("beta"));
        assert_eq!(store.read().as_deref(), Some(""));
        assert_partition(&registry);

        registry.disable("beta").unwrap();
        assert_eq!(surface.snapshot(), before);
        assert_eq!(store.read().as_deref(), Some("beta"));
        assert_partition(&registry);
    }

    #[test]
    fn precondition_failures_leave_state_alone() {
        let (surface, store, mut registry) = registry(Some("beta"));
        let before = surface.snapshot();

        assert_eq!(registry.enable("nope"), Err(PluginError::Unknown("nope".into())));
        assert_eq!(registry.enable("alpha"), Err(PluginError::NotDisabled("alpha".into())));
        assert_eq!(registry.disable("beta"), Err(PluginError::NotEnabled("beta".into())));
        assert_eq!(registry.disable("nope"), Err(PluginError::Unknown("nope".into())));

        assert_eq!(surface.snapshot(), before);
        assert_eq!(store.read().as_deref(), Some("beta"));
        assert_eq!(registry.enabled_names(), vec!["alpha"]);
    }

    #[test]
    fn failing_enable_keeps_plugin_disabled() {
        let (_, store, mut registry) = registry(Some("broken"));
        let err = registry.enable("broken").unwrap_err();
        assert!(matches!(err, PluginError::Initialization { .. }));
        assert_eq!(store.read().as_deref(), Some("broken"));
        assert!(registry.disabled_names().contains(&"broken".to_string()));

        let err = registry.enable("hollow").unwrap_err();
        assert!(matches!(err, PluginError::Initialization { .. }));
    }

    #[test]
    fn disabling_drops_plugin_from_views() {
        let (surface, _, mut registry) = registry(None);
        registry.disable("alpha").unwrap();

        assert!(registry.feature_descriptions().is_empty());
        let descs = registry.command_descriptions();
        assert!(!descs.contains_key("a1"));
        assert_eq!(descs["shared"], "From beta");
        assert!(!surface.contains("a1"));
        assert_eq!(surface.owner_of("shared").as_deref(), Some("beta"));
    }

    #[test]
    fn unknown_names_in_store_are_ignored() {
        let (_, _, registry) = registry(Some("ghost,alpha"));
        assert_eq!(registry.enabled_names(), vec!["beta"]);
        assert_partition(&registry);
    }

    #[test]
    fn instances_are_keyed_by_catalog_name() {
        let (surface, store, mut registry) = with_catalog(None, vec![
            PluginDescriptor::new("alpha", mislabeled),
        ]);
        assert_eq!(registry.enabled_names(), vec!["alpha"]);
        assert!(registry.disabled_names().is_empty());
        assert_partition(&registry);

        registry.disable("alpha").unwrap();
        assert!(surface.is_empty());
        assert_eq!(store.read().as_deref(), Some("alpha"));

        registry.enable("alpha").unwrap();
        assert_eq!(surface.names(), vec!["x"]);
        assert_partition(&registry);
    }

    #[test]
    fn same_reported_name_keeps_both_instances() {
        let (surface, _, mut registry) = with_catalog(None, vec![
            PluginDescriptor::new("alpha", mislabeled),
            PluginDescriptor::new("beta", mislabeled),
        ]);
        assert_eq!(registry.enabled_names(), vec!["alpha", "beta"]);

        registry.disable("alpha").unwrap();
        registry.disable("beta").unwrap();
        assert!(surface.is_empty());
    }

    #[test]
    fn failed_construction_leaves_no_bindings() {
        let (surface, store, mut registry) = with_catalog(None, vec![
            PluginDescriptor::new("alpha", alpha),
            PluginDescriptor::new("half", half),
        ]);
        let before = surface.snapshot();
        assert!(!surface.contains("leak"));
        assert_eq!(surface.owner_of("a1").as_deref(), Some("alpha"));
        assert_eq!(registry.disabled_names(), vec!["half"]);

        store.write("half".to_string());
        let err = registry.enable("half").unwrap_err();
        assert!(matches!(err, PluginError::Initialization { .. }));
        assert_eq!(surface.snapshot(), before);
        assert_eq!(store.read().as_deref(), Some("half"));
        assert_partition(&registry);
    }
}
