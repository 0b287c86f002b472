// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog transports.
//!
//! Messages arrive either as single UDP datagrams or as newline-
//! delimited lines on a TCP stream. Both paths run each message
//! through the filter chain synchronously and enqueue the parsed
//! record; a frame larger than [`MAX_FRAME_LEN`] fails framing for
//! that frame only and the stream resynchronizes at the next newline.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use telemetry_pipeline::buffer::{BatchCollector, RecordBuffer};
use telemetry_pipeline::record::{LogRecord, TelemetryRecord};

use crate::filter::FilterChain;

/// Upper bound on one syslog frame, UDP datagram or TCP line.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const TCP_READ_CHUNK: usize = 8 * 1024;

pub const COLLECTOR_NAME: &str = "syslog";

/// Configuration for the syslog transports.
pub struct SyslogSourceConfig {
    /// Host to bind both listeners to (e.g. "0.0.0.0")
    pub host: String,
    /// UDP datagram port (e.g. 1514)
    pub udp_port: u16,
    /// Line-delimited TCP port (e.g. 1468)
    pub tcp_port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum SyslogSourceError {
    #[error("failed to bind syslog {transport} listener on {address}: {source}")]
    Bind {
        transport: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs parsed records through to the dispatcher, resetting the
/// chain's per-filter index counters at the start of each cycle.
pub struct SyslogCollector {
    chain: Arc<FilterChain>,
}

impl SyslogCollector {
    pub fn new(chain: Arc<FilterChain>) -> Self {
        Self { chain }
    }
}

impl BatchCollector for SyslogCollector {
    type Item = LogRecord;

    fn name(&self) -> &str {
        COLLECTOR_NAME
    }

    fn transform(&self, items: Vec<LogRecord>) -> Vec<TelemetryRecord> {
        // Indexes were stamped at parse time; restart the counters so
        // the next cycle's records begin at 0 again.
        self.chain.reset_indexes();
        items.into_iter().map(TelemetryRecord::Log).collect()
    }
}

enum DatagramReader {
    UdpSocket(UdpSocket),

    #[allow(dead_code)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl DatagramReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            DatagramReader::UdpSocket(socket) => {
                let mut buf = [0; MAX_FRAME_LEN];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                Ok((buf[..amt].to_owned(), src))
            }
            DatagramReader::MirrorTest(data, src) => Ok((data.clone(), *src)),
        }
    }
}

/// Syslog UDP server; one datagram is one message.
pub struct SyslogUdpSource {
    cancel_token: CancellationToken,
    chain: Arc<FilterChain>,
    buffer: Arc<RecordBuffer<SyslogCollector>>,
    reader: DatagramReader,
}

impl SyslogUdpSource {
    pub async fn new(
        config: &SyslogSourceConfig,
        chain: Arc<FilterChain>,
        buffer: Arc<RecordBuffer<SyslogCollector>>,
        cancel_token: CancellationToken,
    ) -> Result<SyslogUdpSource, SyslogSourceError> {
        let address = format!("{}:{}", config.host, config.udp_port);
        let socket = UdpSocket::bind(&address)
            .await
            .map_err(|source| SyslogSourceError::Bind {
                transport: "UDP",
                address: address.clone(),
                source,
            })?;
        debug!("syslog UDP source bound on {address}");

        Ok(SyslogUdpSource {
            cancel_token,
            chain,
            buffer,
            reader: DatagramReader::UdpSocket(socket),
        })
    }

    pub async fn spin(self) {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("syslog UDP source cancelled");
                    break;
                }
                _ = self.consume_datagram() => {}
            }
        }
    }

    async fn consume_datagram(&self) {
        let (buf, src) = match self.reader.read().await {
            Ok(read) => read,
            Err(e) => {
                warn!("syslog UDP receive error: {e}");
                return;
            }
        };

        let text = String::from_utf8_lossy(&buf);
        let text = text.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            return;
        }
        let record = self.chain.process(text, src.ip());
        self.buffer.enqueue(record);
    }
}

/// Splits a TCP byte stream into newline-delimited frames.
///
/// A line exceeding [`MAX_FRAME_LEN`] is dropped; the splitter then
/// discards bytes until the next newline and resumes framing there.
struct LineAssembler {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineAssembler {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
            discarding: false,
        }
    }

    fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in data {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    let raw = std::mem::take(&mut self.pending);
                    let text = String::from_utf8_lossy(&raw);
                    let text = text.trim_end_matches('\r');
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                }
                self.pending.clear();
                continue;
            }
            if self.discarding {
                continue;
            }
            if self.pending.len() == MAX_FRAME_LEN {
                warn!("syslog TCP frame exceeds {MAX_FRAME_LEN} bytes, dropping until next newline");
                self.pending.clear();
                self.discarding = true;
                continue;
            }
            self.pending.push(byte);
        }
        lines
    }
}

/// Syslog TCP server; each accepted connection is handled on its own
/// task and contributes newline-delimited messages.
pub struct SyslogTcpSource {
    cancel_token: CancellationToken,
    chain: Arc<FilterChain>,
    buffer: Arc<RecordBuffer<SyslogCollector>>,
    listener: TcpListener,
}

impl SyslogTcpSource {
    pub async fn new(
        config: &SyslogSourceConfig,
        chain: Arc<FilterChain>,
        buffer: Arc<RecordBuffer<SyslogCollector>>,
        cancel_token: CancellationToken,
    ) -> Result<SyslogTcpSource, SyslogSourceError> {
        let address = format!("{}:{}", config.host, config.tcp_port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| SyslogSourceError::Bind {
                transport: "TCP",
                address: address.clone(),
                source,
            })?;
        debug!("syslog TCP source bound on {address}");

        Ok(SyslogTcpSource {
            cancel_token,
            chain,
            buffer,
            listener,
        })
    }

    pub async fn spin(self) {
        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("syslog TCP source cancelled");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("syslog TCP connection from {peer}");
                            let chain = Arc::clone(&self.chain);
                            let buffer = Arc::clone(&self.buffer);
                            let cancel_token = self.cancel_token.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, peer, chain, buffer, cancel_token)
                                    .await;
                            });
                        }
                        Err(e) => {
                            warn!("syslog TCP accept error: {e}");
                        }
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    chain: Arc<FilterChain>,
    buffer: Arc<RecordBuffer<SyslogCollector>>,
    cancel_token: CancellationToken,
) {
    let mut assembler = LineAssembler::new();
    let mut chunk = [0; TCP_READ_CHUNK];
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => break,
            read = stream.read(&mut chunk) => {
                match read {
                    Ok(0) => {
                        debug!("syslog TCP connection from {peer} closed");
                        break;
                    }
                    Ok(amt) => {
                        for line in assembler.push(&chunk[..amt]) {
                            let record = chain.process(&line, peer.ip());
                            buffer.enqueue(record);
                        }
                    }
                    Err(e) => {
                        warn!("syslog TCP read error from {peer}: {e}");
                        break;
                    }
                }
            }
        }
    }
}
