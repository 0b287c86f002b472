// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory persistence backend, used by tests and local runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::TelemetryRecord;
use crate::store::PersistenceStore;

pub const MEMORY_STORE_IDENTIFIER: &str = "memory";

/// Keeps every stored record in a mutexed vec.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored so far, in arrival order.
    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        #[allow(clippy::expect_used)]
        self.records.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::expect_used)]
        self.records.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    fn identifier(&self) -> &str {
        MEMORY_STORE_IDENTIFIER
    }

    async fn start(&self, _timeout: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn stop(&self, _timeout: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store(&self, record: TelemetryRecord) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        self.records.lock().expect("lock poisoned").push(record);
        Ok(())
    }

    async fn store_batch(&self, records: Vec<TelemetryRecord>) -> Result<usize, StoreError> {
        let stored = records.len();
        #[allow(clippy::expect_used)]
        self.records.lock().expect("lock poisoned").extend(records);
        Ok(stored)
    }
}
