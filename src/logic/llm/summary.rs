//! Batch Summary
//!
//! Bounds the payload sent to the semantic backend: at most `sample_size`
//! records are considered, and only the first 20 are sent verbatim.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::logic::ingest::ConnectionRecord;

/// Raw records included verbatim
pub const SAMPLE_RECORDS: usize = 20;

/// Entries kept in each top-N list
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sample_size: usize,
    pub protocol_distribution: BTreeMap<String, usize>,
    /// (address, count), most frequent first
    pub top_sources: Vec<(String, usize)>,
    pub top_destinations: Vec<(String, usize)>,
    pub sample_records: Vec<ConnectionRecord>,
}

impl BatchSummary {
    pub fn build(records: &[ConnectionRecord], sample_size: usize) -> Self {
        let sample = &records[..records.len().min(sample_size)];

        let mut protocols = BTreeMap::new();
        let mut sources: HashMap<&str, usize> = HashMap::new();
        let mut destinations: HashMap<&str, usize> = HashMap::new();

        for record in sample {
            *protocols.entry(label(&record.protocol).to_lowercase()).or_insert(0) += 1;
            *sources.entry(label(&record.src_ip)).or_insert(0) += 1;
            *destinations.entry(label(&record.dst_ip)).or_insert(0) += 1;
        }

        Self {
            sample_size: sample.len(),
            protocol_distribution: protocols,
            top_sources: top_n(sources),
            top_destinations: top_n(destinations),
            sample_records: sample.iter().take(SAMPLE_RECORDS).cloned().collect(),
        }
    }
}

fn label(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

/// Count descending, then address ascending
fn top_n(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(src: &str, dst: &str, proto: &str) -> ConnectionRecord {
        ConnectionRecord {
            src_ip: src.into(),
            dst_ip: dst.into(),
            protocol: proto.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_counts_and_order() {
        let mut records = vec![record("10.0.0.5", "10.0.0.1", "TCP"); 3];
        records.push(record("10.0.0.9", "10.0.0.1", "udp"));
        records.push(record("", "10.0.0.2", "tcp"));

        let summary = BatchSummary::build(&records, 100);
        assert_eq!(summary.sample_size, 5);
        assert_eq!(summary.protocol_distribution.get("tcp"), Some(&4));
        assert_eq!(summary.top_sources[0], ("10.0.0.5".to_string(), 3));
        assert!(summary.top_sources.iter().any(|(ip, _)| ip == "unknown"));
        assert_eq!(summary.top_destinations[0], ("10.0.0.1".to_string(), 4));
    }

    #[test]
    fn test_summary_bounds() {
        let records: Vec<ConnectionRecord> = (0..150)
            .map(|i| record(&format!("10.0.{}.{}", i / 100, i % 100), "10.0.0.1", "tcp"))
            .collect();

        let summary = BatchSummary::build(&records, 100);
        assert_eq!(summary.sample_size, 100);
        assert_eq!(summary.top_sources.len(), TOP_N);
        assert_eq!(summary.sample_records.len(), SAMPLE_RECORDS);
        assert_eq!(summary.sample_records[0].src_ip, "10.0.0.0");
    }
}
