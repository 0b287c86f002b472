// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Worker-pool scheduler for delayed and fixed-rate tasks.
//!
//! The scheduler owns a dedicated multi-thread runtime with a fixed
//! worker count so flush work never competes with ingestion threads.
//! Every fixed-rate firing runs as its own spawned task: a firing that
//! panics is contained and never unschedules the ones after it, and
//! firings of a single schedule never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::SchedulerError;

const DEFAULT_WORKERS: usize = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the scheduler's worker pool.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Fixed number of pool worker threads
    pub workers: usize,
    /// How long an idle pool thread is kept alive
    pub idle_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Cancellable handle returned by both scheduling operations.
#[derive(Debug, Clone)]
pub struct ScheduledHandle {
    token: CancellationToken,
}

impl ScheduledHandle {
    /// Cancels pending and future firings. An in-flight firing is not
    /// interrupted mid-execution.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Fixed-size worker pool providing delayed and fixed-rate execution.
pub struct Scheduler {
    runtime: Option<runtime::Runtime>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        if config.workers == 0 {
            return Err(SchedulerError::NoWorkers);
        }
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(config.workers)
            .thread_keep_alive(config.idle_timeout)
            .thread_name("telemetry-scheduler")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    fn handle(&self) -> &runtime::Handle {
        #[allow(clippy::expect_used)]
        self.runtime
            .as_ref()
            .expect("scheduler runtime already shut down")
            .handle()
    }

    /// Runs `task` once after `delay`, unless cancelled first.
    pub fn schedule_once<F, Fut>(&self, delay: Duration, task: F) -> ScheduledHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let pool = self.handle().clone();

        self.handle().spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = sleep(delay) => {}
            }
            if let Err(e) = pool.spawn(task()).await {
                if e.is_panic() {
                    error!("scheduled task panicked: {e}");
                }
            }
        });

        ScheduledHandle { token }
    }

    /// Runs `task` every `period` after an initial delay until the
    /// returned handle is cancelled. A firing that panics is logged and
    /// does not stop subsequent firings.
    pub fn schedule_fixed_rate<F, Fut>(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: F,
    ) -> ScheduledHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let pool = self.handle().clone();
        let task = Arc::new(task);

        self.handle().spawn(async move {
            let mut ticker = interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = task_token.cancelled() => {
                        debug!("fixed-rate schedule cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let task = Arc::clone(&task);
                        // Awaiting the spawned firing keeps firings of
                        // this schedule from overlapping while still
                        // containing a panic to the one firing.
                        if let Err(e) = pool.spawn(task()).await {
                            if e.is_panic() {
                                error!("fixed-rate task firing panicked: {e}");
                            }
                        }
                    }
                }
            }
        });

        ScheduledHandle { token }
    }

    /// Cancels all pending and future firings. In-flight executions are
    /// not awaited.
    pub fn shutdown(mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
