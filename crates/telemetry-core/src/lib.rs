// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Collector composition root: configuration, self-origin log
//! filtering, and the service lifecycle that wires decoders, buffers,
//! scheduler and persistence together.

pub mod config;
pub mod error;
pub mod log_filter;
pub mod services;

pub use config::CollectorConfig;
pub use error::{InsertError, ServicesError};
pub use services::{CollectorsHandle, ServiceStatus, TelemetryServices};
