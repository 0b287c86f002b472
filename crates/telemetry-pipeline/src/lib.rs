// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingestion-to-persistence pipeline for network telemetry.
//!
//! This crate holds the pieces every collector shares: the canonical
//! record model, the batching buffer that decouples producers from
//! storage latency, the worker-pool scheduler driving periodic flushes,
//! and the asynchronous persistence dispatcher with its pluggable
//! backend contract.

pub mod aggregate;
pub mod buffer;
pub mod dispatcher;
pub mod error;
pub mod record;
pub mod scheduler;
pub mod store;
