// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Service lifecycle for the collector.
//!
//! `TelemetryServices` is the composition root: backends are registered
//! up front, `start` resolves the configured one, brings it up, and
//! wires dispatcher, scheduler, buffers and ingest sources together in
//! that order. The returned `CollectorsHandle` carries the non-blocking
//! record insertion surface and `stop`.

use crate::config::CollectorConfig;
use crate::error::{InsertError, ServicesError};
use crate::log_filter::LogCategoryFilter;
use netflow_collector::source::{NetflowCollector, NetflowSource, NetflowSourceConfig};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use syslog_collector::filter::FilterChain;
use syslog_collector::source::{
    SyslogCollector, SyslogSourceConfig, SyslogTcpSource, SyslogUdpSource,
};
use telemetry_pipeline::buffer::{BatchCollector, RecordBuffer};
use telemetry_pipeline::dispatcher::PersistenceDispatcher;
use telemetry_pipeline::record::{LogRecord, MetricRecord, TelemetryRecord};
use telemetry_pipeline::scheduler::{Scheduler, SchedulerConfig};
use telemetry_pipeline::store::{PersistenceStore, StoreRegistry};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const METRIC_COLLECTOR_NAME: &str = "metrics";
pub const CONTROLLER_LOG_COLLECTOR_NAME: &str = "controller-log";

/// Status of the collector services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Services are starting up.
    Starting,
    /// Services are running normally.
    Running,
    /// Services are shutting down.
    Stopping,
    /// Services have stopped.
    Stopped,
}

/// Batches metric records inserted through the handle.
pub struct MetricCollector;

impl BatchCollector for MetricCollector {
    type Item = MetricRecord;

    fn name(&self) -> &str {
        METRIC_COLLECTOR_NAME
    }

    fn transform(&self, items: Vec<MetricRecord>) -> Vec<TelemetryRecord> {
        items.into_iter().map(TelemetryRecord::Metric).collect()
    }
}

/// Batches log records inserted through the handle, assigning
/// batch-local indexes.
pub struct ControllerLogCollector;

impl BatchCollector for ControllerLogCollector {
    type Item = LogRecord;

    fn name(&self) -> &str {
        CONTROLLER_LOG_COLLECTOR_NAME
    }

    fn transform(&self, items: Vec<LogRecord>) -> Vec<TelemetryRecord> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, record)| TelemetryRecord::Log(record.with_index(i as i32)))
            .collect()
    }
}

/// Handle to the running collector services.
///
/// This handle allows inserting records, checking the status and
/// stopping the services.
#[derive(Clone)]
pub struct CollectorsHandle {
    status: Arc<RwLock<ServiceStatus>>,
    status_tx: broadcast::Sender<ServiceStatus>,
    cancel_token: CancellationToken,
    scheduler: Arc<Mutex<Option<Scheduler>>>,
    store: Arc<dyn PersistenceStore>,
    store_timeout: Duration,
    log_filter: Arc<LogCategoryFilter>,
    metric_buffer: Arc<RecordBuffer<MetricCollector>>,
    controller_log_buffer: Arc<RecordBuffer<ControllerLogCollector>>,
    netflow_buffer: Arc<RecordBuffer<NetflowCollector>>,
    syslog_buffer: Arc<RecordBuffer<SyslogCollector>>,
}

impl std::fmt::Debug for CollectorsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorsHandle").finish_non_exhaustive()
    }
}

impl CollectorsHandle {
    /// Check if the services are currently running.
    pub fn is_running(&self) -> bool {
        #[allow(clippy::expect_used)]
        let status = self.status.read().expect("lock poisoned");
        matches!(*status, ServiceStatus::Running)
    }

    /// Get a receiver for status updates.
    pub fn status_receiver(&self) -> broadcast::Receiver<ServiceStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, status: ServiceStatus) {
        {
            #[allow(clippy::expect_used)]
            let mut current = self.status.write().expect("lock poisoned");
            *current = status;
        }
        let _ = self.status_tx.send(status);
    }

    /// Enqueues metric records for the next flush cycle. Never blocks
    /// on persistence I/O; returns the number of records accepted.
    pub fn insert_metric_records(
        &self,
        records: Vec<MetricRecord>,
    ) -> Result<usize, InsertError> {
        if !self.is_running() {
            return Err(InsertError::NotRunning);
        }
        let accepted = records.len();
        for record in records {
            self.metric_buffer.enqueue(record);
        }
        Ok(accepted)
    }

    /// Enqueues log records into the named collector's buffer,
    /// dropping self-originated records first. Returns the number of
    /// records accepted after filtering.
    pub fn insert_log_records(
        &self,
        records: Vec<LogRecord>,
        collector_name: &str,
    ) -> Result<usize, InsertError> {
        if !self.is_running() {
            return Err(InsertError::NotRunning);
        }

        let mut accepted = 0;
        match collector_name {
            CONTROLLER_LOG_COLLECTOR_NAME => {
                for record in records {
                    if self.log_filter.is_ignored(&record) {
                        continue;
                    }
                    self.controller_log_buffer.enqueue(record);
                    accepted += 1;
                }
            }
            netflow_collector::source::COLLECTOR_NAME => {
                for record in records {
                    if self.log_filter.is_ignored(&record) {
                        continue;
                    }
                    self.netflow_buffer.enqueue(record);
                    accepted += 1;
                }
            }
            syslog_collector::source::COLLECTOR_NAME => {
                for record in records {
                    if self.log_filter.is_ignored(&record) {
                        continue;
                    }
                    self.syslog_buffer.enqueue(record);
                    accepted += 1;
                }
            }
            other => return Err(InsertError::UnknownCollector(other.to_string())),
        }
        Ok(accepted)
    }

    /// Stop the services.
    ///
    /// Cancels the ingest sources, closes the buffers without draining
    /// what they still hold, stops the backend and shuts the scheduler
    /// down. In-flight persistence calls are not awaited.
    pub async fn stop(&self) -> Result<(), ServicesError> {
        {
            #[allow(clippy::expect_used)]
            let status = self.status.read().expect("lock poisoned");
            if matches!(*status, ServiceStatus::Stopped | ServiceStatus::Stopping) {
                return Ok(());
            }
        }
        self.set_status(ServiceStatus::Stopping);
        info!("Shutting down collector services");

        self.cancel_token.cancel();

        self.metric_buffer.close();
        self.controller_log_buffer.close();
        self.netflow_buffer.close();
        self.syslog_buffer.close();

        if let Err(e) = self.store.stop(self.store_timeout).await {
            error!("persistence backend failed to stop cleanly: {e}");
        }

        #[allow(clippy::expect_used)]
        let scheduler = self.scheduler.lock().expect("lock poisoned").take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown();
        }

        self.set_status(ServiceStatus::Stopped);
        Ok(())
    }
}

/// Main collector services coordinator.
pub struct TelemetryServices {
    config: Arc<CollectorConfig>,
    registry: StoreRegistry,
}

impl TelemetryServices {
    /// Create a new TelemetryServices instance.
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: StoreRegistry::new(),
        }
    }

    /// Register a persistence backend. Must happen before `start`;
    /// the configured identifier is resolved exactly once at startup.
    pub fn register_backend(&mut self, store: Arc<dyn PersistenceStore>) {
        self.registry.register(store);
    }

    /// Start the collector services.
    ///
    /// Returns a handle that can be used to insert records, monitor and
    /// stop the services.
    pub async fn start(self) -> Result<CollectorsHandle, ServicesError> {
        let config = self.config;
        let status = Arc::new(RwLock::new(ServiceStatus::Starting));
        let (status_tx, _status_rx) = broadcast::channel(16);

        let store = self.registry.resolve(&config.backend_identifier)?;
        let store_timeout = Duration::from_millis(config.store_timeout_ms);
        store.start(store_timeout).await?;
        info!(
            "persistence backend '{}' started",
            config.backend_identifier
        );

        let scheduler = Scheduler::new(SchedulerConfig::default())?;
        let flush_interval = Duration::from_millis(config.flush_interval_ms);
        let log_filter = Arc::new(LogCategoryFilter::new(
            &config.ignored_log_category_patterns,
        ));

        let metric_buffer = RecordBuffer::new(
            MetricCollector,
            PersistenceDispatcher::new(Arc::clone(&store)),
        );
        metric_buffer.start(&scheduler, flush_interval);

        let controller_log_buffer = RecordBuffer::new(
            ControllerLogCollector,
            PersistenceDispatcher::new(Arc::clone(&store)),
        );
        controller_log_buffer.start(&scheduler, flush_interval);

        let netflow_buffer = RecordBuffer::new(
            NetflowCollector,
            PersistenceDispatcher::new(Arc::clone(&store)),
        );
        netflow_buffer.start(&scheduler, flush_interval);

        let filter_chain = Arc::new(FilterChain::new());
        let syslog_buffer = RecordBuffer::new(
            SyslogCollector::new(Arc::clone(&filter_chain)),
            PersistenceDispatcher::new(Arc::clone(&store)),
        );
        syslog_buffer.start(&scheduler, flush_interval);

        let cancel_token = CancellationToken::new();

        let netflow_config = NetflowSourceConfig {
            host: config.host.clone(),
            port: config.netflow_port,
        };
        let netflow_source = NetflowSource::new(
            &netflow_config,
            Arc::clone(&netflow_buffer),
            cancel_token.clone(),
        )
        .await
        .map_err(|e| ServicesError::SourceStart {
            collector: "netflow",
            message: e.to_string(),
        })?;
        tokio::spawn(netflow_source.spin());
        info!(
            "netflow-udp: starting to listen on port {}",
            config.netflow_port
        );

        let syslog_config = SyslogSourceConfig {
            host: config.host.clone(),
            udp_port: config.syslog_udp_port,
            tcp_port: config.syslog_tcp_port,
        };
        let syslog_udp = SyslogUdpSource::new(
            &syslog_config,
            Arc::clone(&filter_chain),
            Arc::clone(&syslog_buffer),
            cancel_token.clone(),
        )
        .await
        .map_err(|e| ServicesError::SourceStart {
            collector: "syslog",
            message: e.to_string(),
        })?;
        tokio::spawn(syslog_udp.spin());
        info!(
            "syslog-udp: starting to listen on port {}",
            config.syslog_udp_port
        );

        let syslog_tcp = SyslogTcpSource::new(
            &syslog_config,
            Arc::clone(&filter_chain),
            Arc::clone(&syslog_buffer),
            cancel_token.clone(),
        )
        .await
        .map_err(|e| ServicesError::SourceStart {
            collector: "syslog",
            message: e.to_string(),
        })?;
        tokio::spawn(syslog_tcp.spin());
        info!(
            "syslog-tcp: starting to listen on port {}",
            config.syslog_tcp_port
        );

        let handle = CollectorsHandle {
            status,
            status_tx,
            cancel_token,
            scheduler: Arc::new(Mutex::new(Some(scheduler))),
            store,
            store_timeout,
            log_filter,
            metric_buffer,
            controller_log_buffer,
            netflow_buffer,
            syslog_buffer,
        };
        handle.set_status(ServiceStatus::Running);
        Ok(handle)
    }
}
