// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP persistence backend.
//!
//! Ships record batches as JSON to a time-series store's ingest
//! endpoint. The remote store owns its own lifecycle; `start`/`stop`
//! here only gate readiness of the client side.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::StoreError;
use crate::record::TelemetryRecord;
use crate::store::PersistenceStore;

pub const HTTP_STORE_IDENTIFIER: &str = "http";

const INGEST_PATH: &str = "/api/v1/telemetry";

/// Backend that POSTs JSON batches to `{base_url}/api/v1/telemetry`.
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, client })
    }

    fn ingest_url(&self) -> String {
        format!("{}{}", self.base_url, INGEST_PATH)
    }

    fn record_to_json(record: &TelemetryRecord) -> Value {
        match record {
            TelemetryRecord::Metric(m) => json!({
                "type": "metric",
                "name": m.name.as_str(),
                "value": m.value,
                "nodeId": m.node_id,
                "timestamp": m.timestamp_ms,
                "category": m.category.to_string(),
                "recordKeys": record.key_string(),
            }),
            TelemetryRecord::Log(l) => json!({
                "type": "log",
                "nodeId": l.node_id,
                "timestamp": l.timestamp_ms,
                "category": l.category.to_string(),
                "recordKeys": record.key_string(),
                "text": l.text,
                "index": l.index,
            }),
        }
    }

    async fn ship(&self, records: &[TelemetryRecord]) -> Result<usize, StoreError> {
        let payload = json!({
            "records": records.iter().map(Self::record_to_json).collect::<Vec<_>>(),
        });

        let resp = self
            .client
            .post(self.ingest_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            debug!("shipped {} records to {}", records.len(), self.base_url);
            Ok(records.len())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::Destination {
                status: Some(status.as_u16()),
                message: body,
            })
        }
    }
}

#[async_trait]
impl PersistenceStore for HttpStore {
    fn identifier(&self) -> &str {
        HTTP_STORE_IDENTIFIER
    }

    async fn start(&self, _timeout: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn stop(&self, _timeout: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store(&self, record: TelemetryRecord) -> Result<(), StoreError> {
        self.ship(std::slice::from_ref(&record)).await.map(|_| ())
    }

    async fn store_batch(&self, records: Vec<TelemetryRecord>) -> Result<usize, StoreError> {
        self.ship(&records).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::{LogRecord, MetricRecord, RecordCategory, RecordKey};
    use mockito::Server;

    fn sample_batch() -> Vec<TelemetryRecord> {
        vec![
            TelemetryRecord::Metric(MetricRecord::new(
                "PacketCount",
                17.0,
                "openflow:1",
                1_700_000_000_000,
                RecordCategory::FlowStats,
                vec![RecordKey::new("Table", 0)],
            )),
            TelemetryRecord::Log(
                LogRecord::new(
                    "10.0.0.5",
                    1_700_000_000_000,
                    RecordCategory::Syslog,
                    Vec::new(),
                    "interface up",
                )
                .with_index(1),
            ),
        ]
    }

    #[tokio::test]
    async fn test_store_batch_posts_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/telemetry")
            .match_header("Content-Type", "application/json")
            .with_status(202)
            .create_async()
            .await;

        let store = HttpStore::new(server.url(), Duration::from_secs(2)).unwrap();
        let stored = store.store_batch(sample_batch()).await.unwrap();

        assert_eq!(stored, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_batch_surfaces_destination_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/telemetry")
            .with_status(500)
            .with_body("store unavailable")
            .create_async()
            .await;

        let store = HttpStore::new(server.url(), Duration::from_secs(2)).unwrap();
        let err = store.store_batch(sample_batch()).await.unwrap_err();

        match err {
            StoreError::Destination { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "store unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_trailing_slash_trimmed_from_base_url() {
        let store = HttpStore::new("http://store.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.ingest_url(), "http://store.local/api/v1/telemetry");
    }
}
