use std::sync::{Arc, PoisonError, RwLock};

use crate::Collector;

/// Registry for all available collectors.
///
/// Unlike a map keyed by name, the registry preserves registration order:
/// diagnostics from collectors are concatenated in that order, which defines
/// the tie-break for otherwise identical ranges.
///
/// The lock is only held while the list is copied or edited, never while a
/// collector runs.
///
/// # Examples
///
/// ```no_run
/// use docker_lsp_core::CollectorRegistry;
///
/// let registry = CollectorRegistry::new();
/// // registry.register(Arc::new(DockerfileCollector::new()));
///
/// for collector in registry.for_language("dockerfile") {
///     println!("Registered: {}", collector.name());
/// }
/// ```
pub struct CollectorRegistry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
}

impl CollectorRegistry {
    /// Create a new empty registry
    ///
    /// # Examples
    ///
    /// ```
    /// use docker_lsp_core::CollectorRegistry;
    ///
    /// let registry = CollectorRegistry::new();
    /// assert!(registry.names().is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            collectors: RwLock::new(Vec::new()),
        }
    }

    /// Register a collector implementation.
    ///
    /// A collector whose name is already registered is replaced in place and
    /// keeps its position; a new name is appended.
    pub fn register(&self, collector: Arc<dyn Collector>) {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = collectors
            .iter_mut()
            .find(|existing| existing.name() == collector.name())
        {
            *existing = collector;
        } else {
            collectors.push(collector);
        }
    }

    /// Remove a collector by name. Returns true if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = collectors.len();
        collectors.retain(|collector| collector.name() != name);
        collectors.len() != before
    }

    /// Get collector by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|collector| collector.name() == name)
            .cloned()
    }

    /// Collectors supporting `language_id`, in registration order.
    pub fn for_language(&self, language_id: &str) -> Vec<Arc<dyn Collector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|collector| collector.supports_language_identifier(language_id))
            .cloned()
            .collect()
    }

    /// Names of all registered collectors, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|collector| collector.name())
            .collect()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
