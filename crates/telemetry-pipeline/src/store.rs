// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pluggable persistence backend contract and registry.
//!
//! Backends are registered exactly once before the pipeline starts;
//! `StoreRegistry::resolve` fails fast when the configured identifier
//! is absent instead of waiting for a backend to appear.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::TelemetryRecord;

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Contract every persistence backend implements.
///
/// `store_batch` returns the number of records accepted; the dispatcher
/// logs it on success.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Configuration identifier this backend is selected by.
    fn identifier(&self) -> &str;

    /// Brings the backend up; must complete within `timeout`.
    async fn start(&self, timeout: Duration) -> Result<(), StoreError>;

    /// Tears the backend down; must complete within `timeout`.
    async fn stop(&self, timeout: Duration) -> Result<(), StoreError>;

    /// Persists a single record.
    async fn store(&self, record: TelemetryRecord) -> Result<(), StoreError>;

    /// Persists a batch of records.
    async fn store_batch(&self, records: Vec<TelemetryRecord>) -> Result<usize, StoreError>;
}

impl std::fmt::Debug for dyn PersistenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceStore")
            .field("identifier", &self.identifier())
            .finish()
    }
}

/// One-time backend registration performed at composition time.
#[derive(Default)]
pub struct StoreRegistry {
    backends: HashMap<String, Arc<dyn PersistenceStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend under its own identifier. A later
    /// registration with the same identifier replaces the earlier one.
    pub fn register(&mut self, store: Arc<dyn PersistenceStore>) {
        self.backends.insert(store.identifier().to_string(), store);
    }

    /// Resolves the backend for `identifier`, failing fast when absent.
    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn PersistenceStore>, StoreError> {
        self.backends
            .get(identifier)
            .cloned()
            .ok_or_else(|| StoreError::UnknownBackend(identifier.to_string()))
    }

    pub fn identifiers(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_backend() {
        let mut registry = StoreRegistry::new();
        registry.register(Arc::new(MemoryStore::new()));

        let store = registry.resolve("memory").unwrap();
        assert_eq!(store.identifier(), "memory");
    }

    #[test]
    fn test_resolve_unknown_backend_fails_fast() {
        let registry = StoreRegistry::new();
        let err = registry.resolve("hbase").unwrap_err();
        assert!(matches!(err, StoreError::UnknownBackend(id) if id == "hbase"));
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = StoreRegistry::new();
        let first: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::new());
        let second: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::new());
        registry.register(first);
        registry.register(Arc::clone(&second));

        assert_eq!(registry.identifiers(), vec!["memory"]);
        let resolved = registry.resolve("memory").unwrap();
        assert!(Arc::ptr_eq(&resolved, &second));
    }
}
