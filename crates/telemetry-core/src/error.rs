// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use telemetry_pipeline::error::{SchedulerError, StoreError};

/// Errors that can occur when working with the collector services
#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Persistence backend error: {0}")]
    Store(#[from] StoreError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Failed to start {collector} source: {message}")]
    SourceStart {
        collector: &'static str,
        message: String,
    },
}

/// Errors returned by the non-blocking record insertion surface.
#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("Services not running")]
    NotRunning,

    #[error("No collector registered under name '{0}'")]
    UnknownCollector(String),
}
