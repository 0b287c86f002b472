// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog filter chain.
//!
//! Incoming messages are routed by originator: a relay that forwards
//! on behalf of another element embeds the true source as
//! `Original Address=<addr>` in the message body. Filters registered
//! for a specific originator are tried first, then the wildcard set,
//! and finally the built-in catch-all, so every message resolves to
//! exactly one filter.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use telemetry_pipeline::record::{LogRecord, RecordCategory};

const ORIGINATOR_MARKER: &str = "Original Address";

/// A single routing/parsing rule for syslog text.
///
/// Implementations stamp each produced record with a strictly
/// increasing per-filter `index` so records sharing a millisecond
/// timestamp stay ordered; the counter restarts at every flush cycle
/// via [`SyslogFilter::reset_index`].
pub trait SyslogFilter: Send + Sync {
    /// Whether this filter accepts the given message text.
    fn matches(&self, text: &str) -> bool;

    /// Parses the message into a record. `forwarder` is the transport
    /// peer address, used as the node identity when the message does
    /// not carry an originator of its own.
    fn parse(&self, text: &str, forwarder: IpAddr) -> LogRecord;

    /// Identifier of the downstream destination this filter routes to.
    fn destination(&self) -> u32;

    /// Restarts the per-filter index counter at zero.
    fn reset_index(&self);
}

/// Extracts the relayed originator address from a message body.
///
/// Looks for the literal `Original Address` marker, then the next `=`,
/// then the next space after it; the trimmed substring in between is
/// the originator. Returns `None` when any of the three is missing,
/// in which case callers fall back to the transport peer address.
pub fn extract_originator(text: &str) -> Option<String> {
    let marker = text.find(ORIGINATOR_MARKER)?;
    let after_marker = &text[marker + ORIGINATOR_MARKER.len()..];
    let eq = after_marker.find('=')?;
    let after_eq = &after_marker[eq + 1..];
    let end = after_eq.find(' ')?;
    let originator = after_eq[..end].trim();
    if originator.is_empty() {
        None
    } else {
        Some(originator.to_string())
    }
}

/// Default filter: accepts every message and records it verbatim.
pub struct CatchAllFilter {
    index: AtomicI32,
}

impl CatchAllFilter {
    pub fn new() -> Self {
        Self {
            index: AtomicI32::new(0),
        }
    }
}

impl Default for CatchAllFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyslogFilter for CatchAllFilter {
    fn matches(&self, _text: &str) -> bool {
        true
    }

    fn parse(&self, text: &str, forwarder: IpAddr) -> LogRecord {
        let node_id =
            extract_originator(text).unwrap_or_else(|| forwarder.to_string());
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        LogRecord::new(node_id, now_ms(), RecordCategory::Syslog, Vec::new(), text)
            .with_index(index)
    }

    fn destination(&self) -> u32 {
        0
    }

    fn reset_index(&self) {
        self.index.store(0, Ordering::Relaxed);
    }
}

/// Originator-keyed filter routing with a guaranteed fallback.
pub struct FilterChain {
    by_originator: HashMap<String, Vec<Arc<dyn SyslogFilter>>>,
    wildcard: Vec<Arc<dyn SyslogFilter>>,
    catch_all: Arc<CatchAllFilter>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            by_originator: HashMap::new(),
            wildcard: Vec::new(),
            catch_all: Arc::new(CatchAllFilter::new()),
        }
    }

    /// Registers a filter tried only for messages from `originator`.
    pub fn register(&mut self, originator: impl Into<String>, filter: Arc<dyn SyslogFilter>) {
        self.by_originator
            .entry(originator.into())
            .or_default()
            .push(filter);
    }

    /// Registers a filter tried for any originator, ahead of the
    /// catch-all.
    pub fn register_wildcard(&mut self, filter: Arc<dyn SyslogFilter>) {
        self.wildcard.push(filter);
    }

    /// Routes one message to the first accepting filter and parses it.
    ///
    /// Resolution is total: the catch-all accepts anything the
    /// originator-specific and wildcard filters decline.
    pub fn process(&self, text: &str, forwarder: IpAddr) -> LogRecord {
        let originator =
            extract_originator(text).unwrap_or_else(|| forwarder.to_string());

        if let Some(filters) = self.by_originator.get(&originator) {
            for filter in filters {
                if filter.matches(text) {
                    return filter.parse(text, forwarder);
                }
            }
        }
        for filter in &self.wildcard {
            if filter.matches(text) {
                return filter.parse(text, forwarder);
            }
        }
        self.catch_all.parse(text, forwarder)
    }

    /// Resets every registered filter's index counter, including the
    /// catch-all's. Called at the start of each flush transform.
    pub fn reset_indexes(&self) {
        for filters in self.by_originator.values() {
            for filter in filters {
                filter.reset_index();
            }
        }
        for filter in &self.wildcard {
            filter.reset_index();
        }
        self.catch_all.reset_index();
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> i64 {
    #[allow(clippy::expect_used)]
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch");
    elapsed.as_millis() as i64
}
