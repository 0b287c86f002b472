// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous persistence dispatch.
//!
//! `dispatch` hands a batch to the backend's async store operation and
//! returns immediately; the producer never blocks for storage
//! completion. Success is logged at debug, failure at error, and a
//! failed batch is not retried or resurfaced — it is lost once
//! dispatched.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::record::TelemetryRecord;
use crate::store::PersistenceStore;

#[derive(Clone)]
pub struct PersistenceDispatcher {
    store: Arc<dyn PersistenceStore>,
}

impl PersistenceDispatcher {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn PersistenceStore> {
        &self.store
    }

    /// Issues the async store call for `batch` tagged with the
    /// originating collector's name. Empty batches are dropped without
    /// a store call. Returns the spawned completion task, or `None`
    /// when nothing was dispatched.
    pub fn dispatch(&self, batch: Vec<TelemetryRecord>, collector: &str) -> Option<JoinHandle<()>> {
        if batch.is_empty() {
            return None;
        }

        let op = format!("store_batch[{collector}]");
        let store = Arc::clone(&self.store);
        Some(tokio::spawn(async move {
            match store.store_batch(batch).await {
                Ok(stored) => debug!("{op} succeeded: {stored} records stored"),
                Err(e) => error!("{op} failed: {e}"),
            }
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::record::{LogRecord, RecordCategory};
    use crate::store::{MemoryStore, PersistenceStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct FailingStore;

    #[async_trait]
    impl PersistenceStore for FailingStore {
        fn identifier(&self) -> &str {
            "failing"
        }

        async fn start(&self, _timeout: Duration) -> Result<(), StoreError> {
            Ok(())
        }

        async fn stop(&self, _timeout: Duration) -> Result<(), StoreError> {
            Ok(())
        }

        async fn store(&self, _record: TelemetryRecord) -> Result<(), StoreError> {
            Err(StoreError::Transport("backend down".to_string()))
        }

        async fn store_batch(
            &self,
            _records: Vec<TelemetryRecord>,
        ) -> Result<usize, StoreError> {
            Err(StoreError::Transport("backend down".to_string()))
        }
    }

    fn batch(n: usize) -> Vec<TelemetryRecord> {
        (0..n)
            .map(|i| {
                TelemetryRecord::Log(LogRecord::new(
                    "n1",
                    i as i64,
                    RecordCategory::Syslog,
                    Vec::new(),
                    format!("line {i}"),
                ))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_batch_is_dropped_without_store_call() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = PersistenceDispatcher::new(Arc::clone(&store) as Arc<dyn PersistenceStore>);

        assert!(dispatcher.dispatch(Vec::new(), "flowstats").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_successful_dispatch_logs_debug_with_op_name() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = PersistenceDispatcher::new(Arc::clone(&store) as Arc<dyn PersistenceStore>);

        let handle = dispatcher.dispatch(batch(2), "syslog").unwrap();
        handle.await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(logs_contain("store_batch[syslog] succeeded: 2 records stored"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_dispatch_logs_error_and_is_not_retried() {
        let dispatcher = PersistenceDispatcher::new(Arc::new(FailingStore));

        let handle = dispatcher.dispatch(batch(1), "netflow").unwrap();
        handle.await.unwrap();

        assert!(logs_contain("store_batch[netflow] failed"));
        assert!(logs_contain("backend down"));
    }
}
