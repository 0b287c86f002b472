// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use telemetry_core::{CollectorConfig, TelemetryServices};
use telemetry_pipeline::record::{MetricRecord, RecordCategory, TelemetryRecord};
use telemetry_pipeline::store::{MemoryStore, PersistenceStore};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

// Fixed high ports; each test uses its own offset so they can run in
// parallel within one process.
const NETFLOW_PORT: u16 = 42055;
const SYSLOG_UDP_PORT: u16 = 41514;
const SYSLOG_TCP_PORT: u16 = 41468;

fn config(port_offset: u16) -> CollectorConfig {
    CollectorConfig {
        flush_interval_ms: 200,
        host: "127.0.0.1".to_string(),
        netflow_port: NETFLOW_PORT + port_offset,
        syslog_udp_port: SYSLOG_UDP_PORT + port_offset,
        syslog_tcp_port: SYSLOG_TCP_PORT + port_offset,
        log_level: "error".to_string(),
        ..Default::default()
    }
}

fn netflow_v5_packet(flow_count: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&5u16.to_be_bytes());
    buf.extend_from_slice(&flow_count.to_be_bytes());
    buf.extend_from_slice(&[0u8; 20]);
    for _ in 0..flow_count {
        buf.extend_from_slice(&[0u8; 48]);
    }
    buf
}

#[tokio::test]
async fn test_end_to_end_udp_ingest_to_store() {
    let config = config(0);
    let netflow_port = config.netflow_port;
    let syslog_udp_port = config.syslog_udp_port;

    let store = Arc::new(MemoryStore::new());
    let mut services = TelemetryServices::new(config);
    services.register_backend(Arc::clone(&store) as Arc<dyn PersistenceStore>);
    let handle = services.start().await.unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(
            &netflow_v5_packet(3),
            ("127.0.0.1", netflow_port),
        )
        .await
        .unwrap();
    client
        .send_to(
            b"<14>relay: Original Address=10.0.0.5 link down",
            ("127.0.0.1", syslog_udp_port),
        )
        .await
        .unwrap();

    // Two flush cycles of headroom for receive + flush + dispatch.
    tokio::time::sleep(Duration::from_millis(700)).await;

    let snapshot = store.snapshot();
    let flows = snapshot
        .iter()
        .filter(|r| matches!(r, TelemetryRecord::Log(l) if l.category == RecordCategory::Netflow))
        .count();
    let syslogs: Vec<_> = snapshot
        .iter()
        .filter_map(|r| match r {
            TelemetryRecord::Log(l) if l.category == RecordCategory::Syslog => Some(l),
            _ => None,
        })
        .collect();

    assert_eq!(flows, 3);
    assert_eq!(syslogs.len(), 1);
    assert_eq!(syslogs[0].node_id, "10.0.0.5");

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_end_to_end_tcp_syslog_and_inserted_metrics() {
    let config = config(100);
    let syslog_tcp_port = config.syslog_tcp_port;

    let store = Arc::new(MemoryStore::new());
    let mut services = TelemetryServices::new(config);
    services.register_backend(Arc::clone(&store) as Arc<dyn PersistenceStore>);
    let handle = services.start().await.unwrap();

    {
        let mut client = TcpStream::connect(("127.0.0.1", syslog_tcp_port))
            .await
            .unwrap();
        client
            .write_all(b"<14>host: first line\n<14>host: second line\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();
    }

    handle
        .insert_metric_records(vec![MetricRecord::new(
            "port.rx.bytes",
            4096.0,
            "openflow:1",
            1_700_000_000_000,
            RecordCategory::FlowStats,
            Vec::new(),
        )])
        .unwrap();

    tokio::time::sleep(Duration::from_millis(700)).await;

    let snapshot = store.snapshot();
    let syslog_count = snapshot
        .iter()
        .filter(|r| matches!(r, TelemetryRecord::Log(l) if l.category == RecordCategory::Syslog))
        .count();
    let metric_count = snapshot
        .iter()
        .filter(|r| matches!(r, TelemetryRecord::Metric(_)))
        .count();

    assert_eq!(syslog_count, 2);
    assert_eq!(metric_count, 1);

    handle.stop().await.unwrap();
}
