// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Drops self-originated log records before they reach the buffer.
//!
//! The collector's own tracing output can be fed back through the
//! syslog path when the host forwards local logs; without a guard,
//! every persisted record would spawn more records. Two built-in
//! patterns matching this crate family's log lines are always applied,
//! in addition to any patterns from the configuration.

use regex::Regex;
use telemetry_pipeline::record::LogRecord;
use tracing::error;

const BUILTIN_PATTERNS: [&str; 2] = [".*telemetry_pipeline.*", ".*telemetry_collect.*"];

pub struct LogCategoryFilter {
    patterns: Vec<Regex>,
}

impl LogCategoryFilter {
    /// Compiles the built-in patterns plus `configured` ones; a
    /// configured pattern that fails to compile is skipped with an
    /// error log.
    pub fn new(configured: &[String]) -> Self {
        let mut patterns = Vec::with_capacity(BUILTIN_PATTERNS.len() + configured.len());
        for pattern in BUILTIN_PATTERNS {
            #[allow(clippy::expect_used)]
            patterns.push(Regex::new(pattern).expect("built-in pattern is valid"));
        }
        for pattern in configured {
            match Regex::new(pattern) {
                Ok(regex) => patterns.push(regex),
                Err(e) => {
                    error!("ignoring invalid log category pattern '{pattern}': {e}");
                }
            }
        }
        Self { patterns }
    }

    /// Whether the record should be dropped instead of buffered.
    pub fn is_ignored(&self, record: &LogRecord) -> bool {
        self.patterns.iter().any(|p| p.is_match(&record.text))
    }
}

impl Default for LogCategoryFilter {
    fn default() -> Self {
        Self::new(&[])
    }
}
