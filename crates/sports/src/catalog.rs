use std::sync::Arc;

use crate::adapter::SportAdapter;

/// The set of sports this process serves, looked up by name.
#[derive(Clone, Default)]
pub struct SportCatalog {
    adapters: Vec<Arc<dyn SportAdapter>>,
}

impl SportCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter. A later adapter with the same name replaces the earlier one.
    pub fn with(mut self, adapter: Arc<dyn SportAdapter>) -> Self {
        self.adapters.retain(|a| a.name() != adapter.name());
        self.adapters.push(adapter);
        self
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn SportAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SportAdapter>> {
        self.adapters.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }
}

impl std::fmt::Debug for SportCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SportCatalog")
            .field("sports", &self.names())
            .finish()
    }
}
