//! Plugin registry.
//!
//! Duplicate names are rejected by [`PluginRegistry::register`]; overwriting
//! an existing plugin requires the explicit [`PluginRegistry::replace`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use astral_core::{AstralError, AstralResult, LocationProofPlugin};

/// Registry of location-proof plugins keyed by name.
///
/// Written during setup and teardown, read during evaluation. Lookups hand
/// out `Arc`s so no lock is held across a plugin call.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn LocationProofPlugin>>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plugin under its descriptor name.
    ///
    /// Fails with `DuplicateRegistration` if the name is taken and with
    /// `IncompatiblePlugin` if the plugin targets another interface major.
    pub fn register(&self, plugin: Arc<dyn LocationProofPlugin>) -> AstralResult<()> {
        let descriptor = plugin.descriptor();
        descriptor.check_compatibility()?;

        let name = descriptor.name.clone();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(AstralError::DuplicateRegistration(name));
        }

        tracing::debug!(
            plugin = %name,
            version = %descriptor.version,
            trust_root = %descriptor.trust_root,
            "plugin registered"
        );
        plugins.insert(name, plugin);
        Ok(())
    }

    /// Register a plugin, overwriting any plugin of the same name.
    ///
    /// Returns the plugin that was replaced, if any.
    pub fn replace(
        &self,
        plugin: Arc<dyn LocationProofPlugin>,
    ) -> AstralResult<Option<Arc<dyn LocationProofPlugin>>> {
        plugin.descriptor().check_compatibility()?;

        let name = plugin.name().to_string();
        let previous = self.plugins.write().insert(name.clone(), plugin);
        if previous.is_some() {
            tracing::info!(plugin = %name, "plugin replaced");
        }
        Ok(previous)
    }

    /// Remove a plugin.
    pub fn unregister(&self, name: &str) -> AstralResult<Arc<dyn LocationProofPlugin>> {
        self.plugins
            .write()
            .remove(name)
            .ok_or_else(|| AstralError::PluginNotFound(name.to_string()))
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> AstralResult<Arc<dyn LocationProofPlugin>> {
        self.plugins
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AstralError::PluginNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
