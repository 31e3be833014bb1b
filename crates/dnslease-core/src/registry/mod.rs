//! Backend registry
//!
//! Adapter crates register a factory under their `DNS_PROVIDER` name;
//! the daemon creates the configured backend through the registry at
//! startup. This keeps provider dispatch a static lookup rather than a
//! hardcoded if-else chain, and lets embedders plug in their own
//! adapters.
//!
//! ```rust,ignore
//! let registry = BackendRegistry::new();
//! dnslease_backend_cloudflare::register(&registry);
//!
//! let backend = registry.create(&config)?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::FailoverConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsBackend, DnsBackendFactory};

/// Registry of DNS backend factories keyed by provider name
///
/// Interior mutability with an `RwLock` allows registration during
/// startup and concurrent lookups afterwards.
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, Box<dyn DnsBackendFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory under its type name
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&self, factory: Box<dyn DnsBackendFactory>) {
        let name = factory.type_name().to_string();
        let mut factories = self.factories.write().unwrap();
        factories.insert(name, factory);
    }

    /// Create the backend selected by `config.backend`
    pub fn create(&self, config: &FailoverConfig) -> Result<Box<dyn DnsBackend>> {
        let backend_type = config.backend.type_name();
        let factories = self.factories.read().unwrap();

        let factory = factories.get(backend_type).ok_or_else(|| {
            Error::config(format!(
                "Unknown DNS_PROVIDER {:?}. Registered providers: {}",
                backend_type,
                {
                    let mut names: Vec<_> = factories.keys().cloned().collect();
                    names.sort();
                    names.join(", ")
                }
            ))
        })?;

        factory.create(config)
    }

    /// Whether a backend type is registered
    pub fn has(&self, name: &str) -> bool {
        self.factories.read().unwrap().contains_key(name)
    }

    /// Names of all registered backend types
    pub fn list(&self) -> Vec<String> {
        self.factories.read().unwrap().keys().cloned().collect()
    }
}
