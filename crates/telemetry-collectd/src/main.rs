// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use telemetry_core::{config::CollectorConfig, services::TelemetryServices};
use telemetry_pipeline::store::{HttpStore, MemoryStore};

#[tokio::main]
pub async fn main() {
    let config = match CollectorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading collector configuration: {e}");
            return;
        }
    };

    let env_filter = format!("hyper=off,h2=off,rustls=off,{}", config.log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let mut services = TelemetryServices::new(config.clone());
    services.register_backend(Arc::new(MemoryStore::new()));

    if let Some(ref store_url) = config.store_url {
        match HttpStore::new(store_url, Duration::from_millis(config.store_timeout_ms)) {
            Ok(store) => services.register_backend(Arc::new(store)),
            Err(e) => {
                error!("Error creating HTTP store for {store_url}: {e}");
                return;
            }
        }
    }

    let handle = match services.start().await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Error starting collector services: {e}");
            return;
        }
    };

    info!(
        "telemetry collector started, flushing every {} ms to backend '{}'",
        config.flush_interval_ms, config.backend_identifier
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Error waiting for shutdown signal: {e}");
    }

    if let Err(e) = handle.stop().await {
        error!("Error stopping collector services: {e}");
    }
    info!("telemetry collector stopped");
}
