//! Traffic Feature Derivation
//!
//! Maps a ConnectionRecord onto the flow schema. Directional values are
//! split evenly (the collector only sees totals) and the remaining columns
//! get typical-TCP approximations.

use crate::logic::ingest::{ConnectionRecord, FieldMap, Scalar};

const MTU: f64 = 1500.0;
const MIN_FRAME: f64 = 64.0;
const TCP_HEADER: f64 = 20.0;

/// Derive the flow field mapping for one connection record
pub fn derive_fields(record: &ConnectionRecord) -> FieldMap {
    let packets = record.packet_count as f64;
    let bytes = record.bytes as f64;
    let duration = record.flow_duration_ms.max(0.0);
    let tcp = record.is_tcp();
    let tcp_flag = |v: f64| if tcp { v } else { 0.0 };

    let bytes_per_packet = if packets > 0.0 { bytes / packets } else { 0.0 };
    let packets_per_sec = if duration > 0.0 { packets / (duration / 1000.0) } else { 0.0 };
    let bytes_per_sec = if duration > 0.0 { bytes / (duration / 1000.0) } else { 0.0 };
    let iat_mean = if packets > 1.0 { duration / (packets - 1.0) } else { duration };

    let pairs: [(&str, f64); 55] = [
        ("Destination Port", record.dst_port as f64),
        ("Flow Duration", duration),
        ("Total Fwd Packets", (packets / 2.0).floor()),
        ("Total Backward Packets", (packets / 2.0).floor()),
        ("Total Length of Fwd Packets", (bytes / 2.0).floor()),
        ("Total Length of Bwd Packets", (bytes / 2.0).floor()),
        ("Fwd Packet Length Max", MTU),
        ("Fwd Packet Length Min", MIN_FRAME),
        ("Fwd Packet Length Mean", bytes_per_packet / 2.0),
        ("Fwd Packet Length Std", 200.0),
        ("Bwd Packet Length Max", MTU),
        ("Bwd Packet Length Min", MIN_FRAME),
        ("Bwd Packet Length Mean", bytes_per_packet / 2.0),
        ("Bwd Packet Length Std", 200.0),
        ("Flow Bytes/s", bytes_per_sec),
        ("Flow Packets/s", packets_per_sec),
        ("Flow IAT Mean", iat_mean),
        ("Flow IAT Std", 100.0),
        ("Flow IAT Max", duration),
        ("Flow IAT Min", 1.0),
        ("Fwd IAT Total", duration / 2.0),
        ("Fwd IAT Mean", iat_mean),
        ("Fwd IAT Std", 50.0),
        ("Fwd IAT Max", duration / 2.0),
        ("Fwd IAT Min", 1.0),
        ("Bwd IAT Total", duration / 2.0),
        ("Bwd IAT Mean", iat_mean),
        ("Bwd IAT Std", 50.0),
        ("Bwd IAT Max", duration / 2.0),
        ("Bwd IAT Min", 1.0),
        ("Fwd PSH Flags", tcp_flag(1.0)),
        ("Bwd PSH Flags", tcp_flag(1.0)),
        ("Fwd URG Flags", 0.0),
        ("Bwd URG Flags", 0.0),
        ("Fwd Header Length", tcp_flag(TCP_HEADER * packets / 2.0)),
        ("Bwd Header Length", tcp_flag(TCP_HEADER * packets / 2.0)),
        ("Fwd Packets/s", packets_per_sec / 2.0),
        ("Bwd Packets/s", packets_per_sec / 2.0),
        ("Min Packet Length", MIN_FRAME),
        ("Max Packet Length", MTU),
        ("Packet Length Mean", bytes_per_packet),
        ("Packet Length Std", 300.0),
        ("Packet Length Variance", 90_000.0),
        ("FIN Flag Count", tcp_flag(1.0)),
        ("SYN Flag Count", tcp_flag(1.0)),
        ("RST Flag Count", 0.0),
        ("PSH Flag Count", tcp_flag(2.0)),
        ("ACK Flag Count", tcp_flag((packets - 2.0).max(0.0))),
        ("URG Flag Count", 0.0),
        ("CWE Flag Count", 0.0),
        ("ECE Flag Count", 0.0),
        ("Down/Up Ratio", 1.0),
        ("Average Packet Size", bytes_per_packet),
        ("Avg Fwd Segment Size", bytes_per_packet / 2.0),
        ("Avg Bwd Segment Size", bytes_per_packet / 2.0),
    ];

    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), Scalar::Number(*value)))
        .collect()
}

/// Collapse all flows of one identity into a single aggregate record.
///
/// Bytes, packets and durations are summed; ports/protocol come from the
/// last record. `None` for an empty slice.
pub fn merge_records(records: &[ConnectionRecord]) -> Option<ConnectionRecord> {
    let last = records.last()?;
    let mut merged = last.clone();
    merged.bytes = records.iter().map(|r| r.bytes).sum();
    merged.packet_count = records.iter().map(|r| r.packet_count).sum();
    merged.flow_duration_ms = records.iter().map(|r| r.flow_duration_ms.max(0.0)).sum();
    Some(merged)
}
