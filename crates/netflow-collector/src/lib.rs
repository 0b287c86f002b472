// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! NetFlow v5 collector: binary packet decoder plus UDP source feeding
//! decoded flow records into the batching buffer.

pub mod decoder;
pub mod source;
