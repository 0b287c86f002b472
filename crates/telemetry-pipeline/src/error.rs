// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Errors produced by persistence backends and the store registry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no persistence backend registered under identifier '{0}'")]
    UnknownBackend(String),

    #[error("failed to build store payload: {0}")]
    Payload(String),

    #[error("store destination rejected the request ({status:?}): {message}")]
    Destination {
        status: Option<u16>,
        message: String,
    },

    #[error("store did not become ready within {0:?}")]
    StartTimeout(Duration),

    #[error("store did not stop within {0:?}")]
    StopTimeout(Duration),

    #[error("store transport error: {0}")]
    Transport(String),
}

/// Errors raised while constructing the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to build scheduler runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("scheduler worker count must be greater than 0")]
    NoWorkers,
}
