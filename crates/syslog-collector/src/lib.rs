// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog collector: originator-keyed filter chain plus UDP and
//! line-delimited TCP sources feeding parsed records into the
//! batching buffer.

pub mod filter;
pub mod source;
