// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! UDP server receiving NetFlow v5 export packets.
//!
//! Packets are decoded synchronously on the receive path and the
//! resulting records are enqueued into the batching buffer; a packet
//! that fails to decode is logged and dropped without affecting the
//! next one.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use telemetry_pipeline::buffer::{BatchCollector, RecordBuffer};
use telemetry_pipeline::record::{LogRecord, TelemetryRecord};

use crate::decoder::decode_packet;

// NetFlow v5 exports are bounded well below this; one datagram carries
// at most 30 flow records (24 + 30 * 48 = 1464 bytes).
const BUFFER_SIZE: usize = 2048;

pub const COLLECTOR_NAME: &str = "netflow";

/// Configuration for the NetFlow UDP server.
pub struct NetflowSourceConfig {
    /// Host to bind the UDP socket to (e.g. "0.0.0.0")
    pub host: String,
    /// Port to bind the UDP socket to (e.g. 2055)
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum NetflowSourceError {
    #[error("failed to bind NetFlow UDP socket on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns decoded flow records into canonical records, assigning
/// batch-local indexes starting at 0 each flush cycle.
pub struct NetflowCollector;

impl BatchCollector for NetflowCollector {
    type Item = LogRecord;

    fn name(&self) -> &str {
        COLLECTOR_NAME
    }

    fn transform(&self, items: Vec<LogRecord>) -> Vec<TelemetryRecord> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, record)| TelemetryRecord::Log(record.with_index(i as i32)))
            .collect()
    }
}

// PacketReader abstracts the datagram transport so tests can replay a
// fixed buffer.
enum PacketReader {
    UdpSocket(tokio::net::UdpSocket),

    #[allow(dead_code)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl PacketReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            PacketReader::UdpSocket(socket) => {
                let mut buf = [0; BUFFER_SIZE];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                Ok((buf[..amt].to_owned(), src))
            }
            PacketReader::MirrorTest(data, src) => Ok((data.clone(), *src)),
        }
    }
}

/// NetFlow v5 UDP server feeding the batching buffer.
pub struct NetflowSource {
    cancel_token: CancellationToken,
    buffer: Arc<RecordBuffer<NetflowCollector>>,
    reader: PacketReader,
}

impl NetflowSource {
    pub async fn new(
        config: &NetflowSourceConfig,
        buffer: Arc<RecordBuffer<NetflowCollector>>,
        cancel_token: CancellationToken,
    ) -> Result<NetflowSource, NetflowSourceError> {
        let address = format!("{}:{}", config.host, config.port);
        let socket = tokio::net::UdpSocket::bind(&address)
            .await
            .map_err(|source| NetflowSourceError::Bind {
                address: address.clone(),
                source,
            })?;
        debug!("NetFlow source bound on {address}");

        Ok(NetflowSource {
            cancel_token,
            buffer,
            reader: PacketReader::UdpSocket(socket),
        })
    }

    /// Main receive loop; returns when the cancellation token fires.
    pub async fn spin(self) {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("NetFlow source cancelled");
                    break;
                }
                _ = self.consume_packet() => {}
            }
        }
    }

    /// Receives and decodes one export packet.
    async fn consume_packet(&self) {
        let (buf, src) = match self.reader.read().await {
            Ok(read) => read,
            Err(e) => {
                warn!("NetFlow receive error: {e}");
                return;
            }
        };

        trace!("received {} bytes from {}", buf.len(), src);
        match decode_packet(&buf, src.ip()) {
            Ok(records) => {
                debug!("decoded {} flow records from {}", records.len(), src);
                for record in records {
                    self.buffer.enqueue(record);
                }
            }
            Err(e) => {
                // Per-packet isolation: drop it and keep receiving.
                warn!("dropping malformed NetFlow packet from {src}: {e}");
            }
        }
    }
}
