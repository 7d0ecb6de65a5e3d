use super::Plugin;
use std::sync::Arc;

/// Lowercase and drop everything from the first `:` (tag) onward.
pub fn normalize_image(image: &str) -> String {
    let untagged = image.split(':').next().unwrap_or_default();
    untagged.to_lowercase()
}

/// Insertion-ordered plugin set. Registration happens once at startup; lookups
/// scan in registration order and the first matcher wins.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op when a plugin with the same id is already registered.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        if self.get(plugin.id()).is_some() {
            tracing::debug!(plugin = plugin.id(), "duplicate plugin id ignored");
            return;
        }
        self.plugins.push(plugin);
    }

    pub fn resolve(&self, image: &str) -> Option<Arc<dyn Plugin>> {
        let normalized = normalize_image(image);
        self.plugins
            .iter()
            .find(|p| p.matches(&normalized))
            .cloned()
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.id() == id).cloned()
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
