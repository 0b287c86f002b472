// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching buffer decoupling producers from storage latency.
//!
//! Producers call `enqueue` from any thread; it pushes under a mutex
//! and never touches I/O. A scheduled flush swaps the queue out under
//! the same mutex, releases it, runs the collector's `transform`, and
//! forwards the result to the persistence dispatcher. Producers are
//! blocked only for the pointer swap, never for transform or store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::dispatcher::PersistenceDispatcher;
use crate::record::TelemetryRecord;
use crate::scheduler::{ScheduledHandle, Scheduler};

/// Collector-specific half of a batching buffer: names the collector
/// and turns a drained batch of raw items into canonical records.
///
/// `transform` must be a pure function of its input batch; log-oriented
/// collectors reset their shared index counter to 0 at the start of
/// each call so record indexes stay batch-local.
pub trait BatchCollector: Send + Sync + 'static {
    type Item: Send + 'static;

    fn name(&self) -> &str;

    fn transform(&self, items: Vec<Self::Item>) -> Vec<TelemetryRecord>;
}

/// Insertion-ordered queue plus scheduled flush for one collector.
pub struct RecordBuffer<C: BatchCollector> {
    collector: C,
    queue: Mutex<Vec<C::Item>>,
    dispatcher: PersistenceDispatcher,
    flush_handle: Mutex<Option<ScheduledHandle>>,
}

impl<C: BatchCollector> RecordBuffer<C> {
    pub fn new(collector: C, dispatcher: PersistenceDispatcher) -> Arc<Self> {
        Arc::new(Self {
            collector,
            queue: Mutex::new(Vec::new()),
            dispatcher,
            flush_handle: Mutex::new(None),
        })
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// Appends one item; O(1), never blocks on I/O.
    pub fn enqueue(&self, item: C::Item) {
        #[allow(clippy::expect_used)]
        self.queue.lock().expect("lock poisoned").push(item);
    }

    /// One flush cycle: swap, transform, dispatch.
    ///
    /// An empty queue causes no transform and no dispatch call.
    pub fn flush(&self) {
        let items = {
            #[allow(clippy::expect_used)]
            let mut queue = self.queue.lock().expect("lock poisoned");
            if queue.is_empty() {
                return;
            }
            std::mem::take(&mut *queue)
        };

        let count = items.len();
        let records = self.collector.transform(items);
        debug!(
            "flush cycle for '{}': {} items -> {} records",
            self.collector.name(),
            count,
            records.len()
        );
        if !records.is_empty() {
            self.dispatcher.dispatch(records, self.collector.name());
        }
    }

    /// Schedules the periodic flush task on `scheduler`. Replaces any
    /// previously scheduled task for this buffer.
    pub fn start(self: &Arc<Self>, scheduler: &Scheduler, flush_interval: Duration) {
        let buffer = Arc::clone(self);
        let handle = scheduler.schedule_fixed_rate(flush_interval, flush_interval, move || {
            let buffer = Arc::clone(&buffer);
            async move {
                buffer.flush();
            }
        });

        #[allow(clippy::expect_used)]
        let mut slot = self.flush_handle.lock().expect("lock poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.cancel();
        }
    }

    /// Cancels the scheduled flush task. Items enqueued but not yet
    /// flushed are discarded, not drained.
    pub fn close(&self) {
        #[allow(clippy::expect_used)]
        if let Some(handle) = self.flush_handle.lock().expect("lock poisoned").take() {
            handle.cancel();
        }
    }

    #[cfg(test)]
    fn queued(&self) -> usize {
        #[allow(clippy::expect_used)]
        self.queue.lock().expect("lock poisoned").len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::{LogRecord, RecordCategory};
    use crate::scheduler::SchedulerConfig;
    use crate::store::{MemoryStore, PersistenceStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tokio::time::sleep;

    /// Captures every batch handed to transform.
    struct RecordingCollector {
        batches: Mutex<Vec<Vec<u32>>>,
        calls: AtomicUsize,
    }

    impl RecordingCollector {
        fn new() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl BatchCollector for RecordingCollector {
        type Item = u32;

        fn name(&self) -> &str {
            "recording"
        }

        fn transform(&self, items: Vec<u32>) -> Vec<TelemetryRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let records = items
                .iter()
                .map(|i| {
                    TelemetryRecord::Log(LogRecord::new(
                        "n1",
                        i64::from(*i),
                        RecordCategory::ControllerLog,
                        Vec::new(),
                        i.to_string(),
                    ))
                })
                .collect();
            self.batches.lock().unwrap().push(items);
            records
        }
    }

    fn memory_dispatcher() -> (Arc<MemoryStore>, PersistenceDispatcher) {
        let store = Arc::new(MemoryStore::new());
        let dispatcher =
            PersistenceDispatcher::new(Arc::clone(&store) as Arc<dyn PersistenceStore>);
        (store, dispatcher)
    }

    #[tokio::test]
    async fn test_flush_calls_transform_once_in_insertion_order() {
        let (store, dispatcher) = memory_dispatcher();
        let buffer = RecordBuffer::new(RecordingCollector::new(), dispatcher);

        buffer.enqueue(1);
        buffer.enqueue(2);
        buffer.flush();

        let collector = buffer.collector();
        assert_eq!(collector.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*collector.batches.lock().unwrap(), vec![vec![1, 2]]);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_flush_on_empty_buffer_is_a_no_op() {
        let (store, dispatcher) = memory_dispatcher();
        let buffer = RecordBuffer::new(RecordingCollector::new(), dispatcher);

        buffer.flush();

        assert_eq!(buffer.collector().calls.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(20)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_flush_empties_queue() {
        let (_store, dispatcher) = memory_dispatcher();
        let buffer = RecordBuffer::new(RecordingCollector::new(), dispatcher);

        buffer.enqueue(7);
        assert_eq!(buffer.queued(), 1);
        buffer.flush();
        assert_eq!(buffer.queued(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_with_flushes_lose_nothing() {
        const PRODUCERS: u32 = 4;
        const ITEMS: u32 = 250;

        let (_store, dispatcher) = memory_dispatcher();
        let buffer = RecordBuffer::new(RecordingCollector::new(), dispatcher);

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let buffer = Arc::clone(&buffer);
            producers.push(thread::spawn(move || {
                for i in 0..ITEMS {
                    buffer.enqueue(p * ITEMS + i);
                }
            }));
        }

        // Flush concurrently while producers run. Flushing stays on the
        // runtime because dispatch spawns its store call there.
        let flusher = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                for _ in 0..20 {
                    buffer.flush();
                    sleep(Duration::from_millis(1)).await;
                }
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        flusher.await.unwrap();
        buffer.flush();

        // Every item observed by exactly one flush cycle.
        let batches = buffer.collector().batches.lock().unwrap();
        let mut seen: Vec<u32> = batches.iter().flatten().copied().collect();
        assert_eq!(seen.len() as u32, PRODUCERS * ITEMS);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len() as u32, PRODUCERS * ITEMS);
    }

    #[test]
    fn test_scheduled_flush_and_close_without_drain() {
        let scheduler = Scheduler::new(SchedulerConfig {
            workers: 2,
            idle_timeout: Duration::from_secs(1),
        })
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let dispatcher =
            PersistenceDispatcher::new(Arc::clone(&store) as Arc<dyn PersistenceStore>);
        let buffer = RecordBuffer::new(RecordingCollector::new(), dispatcher);

        buffer.start(&scheduler, Duration::from_millis(20));
        buffer.enqueue(1);
        buffer.enqueue(2);

        thread::sleep(Duration::from_millis(100));
        assert_eq!(store.len(), 2);

        // Closing cancels the flush task; later items are discarded.
        buffer.close();
        buffer.enqueue(3);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(store.len(), 2);
        assert_eq!(buffer.queued(), 1);

        scheduler.shutdown();
    }
}
