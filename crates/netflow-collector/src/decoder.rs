// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! NetFlow v5 binary decoder.
//!
//! A packet is a 24-byte big-endian header followed by the declared
//! number of fixed 48-byte flow records. Decoding a packet either
//! yields exactly that many records or fails as a unit; a malformed
//! packet never affects the decoder's ability to process the next one.

use std::net::{IpAddr, Ipv4Addr};

use telemetry_pipeline::record::{LogRecord, RecordCategory, RecordKey};

/// Header length in bytes.
pub const HEADER_LEN: usize = 24;
/// Flow record length in bytes.
pub const FLOW_RECORD_LEN: usize = 48;
/// Fixed full-text tag carried by every decoded flow record.
pub const FLOW_RECORD_TEXT: &str = "Flow record";

/// Low 14 bits of the raw sampling field carry the interval.
const SAMPLING_INTERVAL_MASK: u16 = 0x3FFF;

#[derive(Debug, thiserror::Error)]
pub enum NetflowDecodeError {
    #[error("packet truncated: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("unsupported NetFlow version {0}, expected 5")]
    UnsupportedVersion(u16),
}

/// Big-endian read cursor over a packet buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], NetflowDecodeError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < len {
            return Err(NetflowDecodeError::Truncated {
                offset: self.pos,
                needed: len,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, NetflowDecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, NetflowDecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, NetflowDecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_ipv4(&mut self) -> Result<Ipv4Addr, NetflowDecodeError> {
        Ok(Ipv4Addr::from(self.read_u32()?))
    }

    /// Moves the cursor forward to an absolute offset (pad-skip).
    fn seek_to(&mut self, offset: usize) -> Result<(), NetflowDecodeError> {
        if offset > self.buf.len() {
            return Err(NetflowDecodeError::Truncated {
                offset: self.pos,
                needed: offset - self.pos,
                remaining: self.buf.len() - self.pos,
            });
        }
        self.pos = offset;
        Ok(())
    }
}

/// Decoded packet header, consumed once per packet.
#[derive(Debug, Clone, Copy)]
struct PacketHeader {
    count: u16,
    sys_uptime: u32,
    unix_secs: u32,
    unix_nsecs: u32,
    flow_sequence: u32,
    engine_type: u8,
    engine_id: u8,
    sampling_interval: u16,
}

impl PacketHeader {
    fn decode(cursor: &mut Cursor<'_>) -> Result<Self, NetflowDecodeError> {
        let version = cursor.read_u16()?;
        if version != 5 {
            return Err(NetflowDecodeError::UnsupportedVersion(version));
        }
        Ok(Self {
            count: cursor.read_u16()?,
            sys_uptime: cursor.read_u32()?,
            unix_secs: cursor.read_u32()?,
            unix_nsecs: cursor.read_u32()?,
            flow_sequence: cursor.read_u32()?,
            engine_type: cursor.read_u8()?,
            engine_id: cursor.read_u8()?,
            sampling_interval: cursor.read_u16()? & SAMPLING_INTERVAL_MASK,
        })
    }

    fn keys(&self) -> Vec<RecordKey> {
        vec![
            RecordKey::new("sys_uptime", self.sys_uptime),
            RecordKey::new("unix_nsecs", self.unix_nsecs),
            RecordKey::new("flow_sequence", self.flow_sequence),
            RecordKey::new("engine_type", self.engine_type),
            RecordKey::new("engine_id", self.engine_id),
            RecordKey::new("sampling_interval", self.sampling_interval),
        ]
    }
}

/// Decodes one UDP payload into one `LogRecord` per declared flow.
///
/// `exporter` is the packet's source address and becomes the records'
/// node identifier.
pub fn decode_packet(
    buf: &[u8],
    exporter: IpAddr,
) -> Result<Vec<LogRecord>, NetflowDecodeError> {
    let mut cursor = Cursor::new(buf);
    let header = PacketHeader::decode(&mut cursor)?;

    let timestamp_ms = i64::from(header.unix_secs) * 1000;
    let node_id = exporter.to_string();
    let header_keys = header.keys();

    // Cap the pre-allocation by what the buffer can physically hold so
    // a forged count cannot reserve memory the packet never backs.
    let possible = buf.len().saturating_sub(HEADER_LEN) / FLOW_RECORD_LEN;
    let mut records = Vec::with_capacity(usize::from(header.count).min(possible));
    for _ in 0..header.count {
        let record_start = cursor.pos;

        let srcaddr = cursor.read_ipv4()?;
        let dstaddr = cursor.read_ipv4()?;
        let nexthop = cursor.read_ipv4()?;
        let input = cursor.read_u16()?;
        let output = cursor.read_u16()?;
        let d_pkts = cursor.read_u32()?;
        let d_octets = cursor.read_u32()?;
        let first = cursor.read_u32()?;
        let last = cursor.read_u32()?;
        let srcport = cursor.read_u16()?;
        let dstport = cursor.read_u16()?;
        let _reserved = cursor.read_u8()?;
        let tcp_flags = cursor.read_u8()?;
        let prot = cursor.read_u8()?;
        let tos = cursor.read_u8()?;
        let src_as = cursor.read_u16()?;
        let dst_as = cursor.read_u16()?;
        let src_mask = cursor.read_u8()?;
        let dst_mask = cursor.read_u8()?;

        // Skip padding up to the fixed record boundary no matter how
        // many fields were actually read.
        cursor.seek_to(record_start + FLOW_RECORD_LEN)?;

        let flow_duration = last.wrapping_sub(first);

        let mut keys = header_keys.clone();
        keys.extend([
            RecordKey::new("srcaddr", srcaddr),
            RecordKey::new("dstaddr", dstaddr),
            RecordKey::new("nexthop", nexthop),
            RecordKey::new("input", input),
            RecordKey::new("output", output),
            RecordKey::new("dPkts", d_pkts),
            RecordKey::new("dOctets", d_octets),
            RecordKey::new("first", first),
            RecordKey::new("last", last),
            RecordKey::new("srcport", srcport),
            RecordKey::new("dstport", dstport),
            RecordKey::new("tcp_flags", tcp_flags),
            RecordKey::new("prot", prot),
            RecordKey::new("tos", tos),
            RecordKey::new("src_as", src_as),
            RecordKey::new("dst_as", dst_as),
            RecordKey::new("src_mask", src_mask),
            RecordKey::new("dst_mask", dst_mask),
            RecordKey::new("flow_duration", flow_duration),
        ]);

        records.push(LogRecord::new(
            node_id.clone(),
            timestamp_ms,
            RecordCategory::Netflow,
            keys,
            FLOW_RECORD_TEXT,
        ));
    }

    Ok(records)
}
