//! Detection input assembly

use crate::logic::aggregator::SourceSummary;
use crate::logic::detectors::DetectionInput;
use crate::logic::features::{derive_fields, merge_records, normalize};
use crate::logic::ingest::ConnectionRecord;

/// Bundle everything known about `identity` for one cycle.
/// Flow features come from the identity's own connection records; with none,
/// the statistical detector has nothing to score.
pub fn detection_input(
    identity: &str,
    summary: Option<SourceSummary>,
    batch: &[ConnectionRecord],
) -> DetectionInput {
    let own: Vec<ConnectionRecord> = batch
        .iter()
        .filter(|r| r.src_ip == identity)
        .cloned()
        .collect();

    let features = merge_records(&own).map(|flow| normalize(&derive_fields(&flow)));

    let mut input = DetectionInput::new(identity)
        .with_summary(summary.unwrap_or_else(|| SourceSummary::new(identity)))
        .with_batch(own);
    if let Some(features) = features {
        input = input.with_features(features);
    }
    input
}
