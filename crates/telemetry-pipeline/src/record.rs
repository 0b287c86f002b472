// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Canonical telemetry record types shared by every collector.
//!
//! Records are plain immutable data: a decoder or an insert call builds
//! them, a flush cycle consumes them exactly once, and the dispatcher
//! hands them to a persistence backend. Nothing mutates a record after
//! construction.

use std::fmt;

use ustr::Ustr;

/// Source category of a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RecordCategory {
    /// Switch/flow statistics polled from network elements
    #[display("FLOWSTATS")]
    FlowStats,
    /// Syslog messages forwarded by network elements
    #[display("SYSLOG")]
    Syslog,
    /// Controller-internal log lines
    #[display("CONTROLLERLOG")]
    ControllerLog,
    /// NetFlow v5 flow records
    #[display("NETFLOW")]
    Netflow,
}

/// One (name, value) pair of a record's composite dimension key.
///
/// Key order is significant for the rendered key string; uniqueness of
/// names within one record is expected but not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordKey {
    pub name: Ustr,
    pub value: String,
}

impl RecordKey {
    pub fn new(name: &str, value: impl ToString) -> Self {
        Self {
            name: Ustr::from(name),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A numeric sample tied to a node and a composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Name of the sampled metric
    pub name: Ustr,
    /// Sampled value
    pub value: f64,
    /// Originating element identifier
    pub node_id: String,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
    pub category: RecordCategory,
    /// Ordered composite dimension key
    pub keys: Vec<RecordKey>,
}

impl MetricRecord {
    pub fn new(
        name: &str,
        value: f64,
        node_id: impl Into<String>,
        timestamp_ms: i64,
        category: RecordCategory,
        keys: Vec<RecordKey>,
    ) -> Self {
        Self {
            name: Ustr::from(name),
            value,
            node_id: node_id.into(),
            timestamp_ms,
            category,
            keys,
        }
    }
}

/// A textual record (syslog message, log line, decoded flow entry).
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Originating element identifier
    pub node_id: String,
    /// Epoch milliseconds
    pub timestamp_ms: i64,
    pub category: RecordCategory,
    /// Ordered composite dimension key
    pub keys: Vec<RecordKey>,
    /// Full record text
    pub text: String,
    /// Batch-local ordinal disambiguating records that share a
    /// timestamp within one flush cycle. Reset to 0 each cycle.
    pub index: i32,
}

impl LogRecord {
    pub fn new(
        node_id: impl Into<String>,
        timestamp_ms: i64,
        category: RecordCategory,
        keys: Vec<RecordKey>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp_ms,
            category,
            keys,
            text: text.into(),
            index: 0,
        }
    }

    /// Same record with a different batch-local index.
    #[must_use]
    pub fn with_index(mut self, index: i32) -> Self {
        self.index = index;
        self
    }
}

/// Canonical record handed through the buffer to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    Metric(MetricRecord),
    Log(LogRecord),
}

impl TelemetryRecord {
    pub fn node_id(&self) -> &str {
        match self {
            TelemetryRecord::Metric(m) => &m.node_id,
            TelemetryRecord::Log(l) => &l.node_id,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        match self {
            TelemetryRecord::Metric(m) => m.timestamp_ms,
            TelemetryRecord::Log(l) => l.timestamp_ms,
        }
    }

    pub fn category(&self) -> RecordCategory {
        match self {
            TelemetryRecord::Metric(m) => m.category,
            TelemetryRecord::Log(l) => l.category,
        }
    }

    pub fn keys(&self) -> &[RecordKey] {
        match self {
            TelemetryRecord::Metric(m) => &m.keys,
            TelemetryRecord::Log(l) => &l.keys,
        }
    }

    /// Renders the composite key in insertion order, `name=value` pairs
    /// joined by commas. The order is part of the external contract.
    pub fn key_string(&self) -> String {
        let keys = self.keys();
        let mut out = String::new();
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&key.to_string());
        }
        out
    }
}
