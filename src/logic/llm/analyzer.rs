//! Semantic Analyzer
//!
//! The four typed operations on top of an `LlmProvider`. Each one sends a
//! bounded JSON payload plus a fixed instruction and validates the reply.

use std::sync::Arc;

use serde::Serialize;

use super::provider::{LlmError, LlmProvider, Message};
use super::schema::{
    parse_activity_classification, parse_packet_analysis, parse_threat_report,
    parse_traffic_analysis, ActivityClassification, PacketAnalysis, ThreatReport, TrafficAnalysis,
};
use super::summary::BatchSummary;
use crate::logic::ingest::ConnectionRecord;

const SYSTEM_ANALYST: &str = "You are a network security analyst. Analyze the supplied network \
data for anomalous or malicious activity and answer with a single JSON object.";

const TRAFFIC_SCHEMA: &str = r#"{"anomaly_detected": boolean, "confidence": number (0-1), "anomaly_type": string, "description": string, "severity": "none"|"low"|"medium"|"high"|"critical", "source_ips": [string], "target_ips": [string], "recommended_action": string}"#;

const ACTIVITY_SCHEMA: &str = r#"{"classification": "normal"|"suspicious"|"malicious", "anomaly_detected": boolean, "pattern_description": string, "severity": "none"|"low"|"medium"|"high"|"critical", "recommended_action": "monitor"|"investigate"|"block", "confidence": number (0-1)}"#;

const PACKET_SCHEMA: &str = r#"{"threats_detected": boolean, "analysis": string, "techniques": [string], "confidence": number (0-1)}"#;

const REPORT_SCHEMA: &str = r#"{"summary": string, "risk_level": "low"|"medium"|"high"|"critical", "detailed_findings": [string], "remediation_steps": [string], "prevention_guidance": [string]}"#;

const ATTACK_PATTERNS: &str = "Known patterns: port_scan (many destination ports from one source \
in a short time), ddos (very many connections to one target), brute_force (repeated failed \
authentication), data_exfiltration (unusual upload volume from an internal host), malware_c2 \
(regular connections to an unknown host on a fixed schedule).";

pub struct SemanticAnalyzer {
    provider: Arc<dyn LlmProvider>,
    sample_size: usize,
}

impl SemanticAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, sample_size: usize) -> Self {
        Self {
            provider,
            sample_size: sample_size.max(1),
        }
    }

    pub fn summarize(&self, records: &[ConnectionRecord]) -> BatchSummary {
        BatchSummary::build(records, self.sample_size)
    }

    /// Traffic-pattern analysis over arbitrary context (summaries, counters, ...)
    pub async fn analyze_traffic<T: Serialize + Sync>(
        &self,
        traffic: &T,
    ) -> Result<TrafficAnalysis, LlmError> {
        let prompt = format!(
            "Analyze this network traffic data for anomalous activity:\n{}\n\n{}\n\nRespond with JSON: {}",
            to_json(traffic)?,
            ATTACK_PATTERNS,
            TRAFFIC_SCHEMA
        );
        let text = self.ask(prompt).await?;
        Ok(parse_traffic_analysis(&text)?)
    }

    pub async fn classify_activity(
        &self,
        records: &[ConnectionRecord],
    ) -> Result<ActivityClassification, LlmError> {
        let sample = &records[..records.len().min(self.sample_size)];
        let prompt = format!(
            "Classify the activity in these connections:\n{}\n\nRespond with JSON: {}",
            to_json(&sample)?,
            ACTIVITY_SCHEMA
        );
        let text = self.ask(prompt).await?;
        Ok(parse_activity_classification(&text)?)
    }

    pub async fn analyze_packets(
        &self,
        records: &[ConnectionRecord],
    ) -> Result<PacketAnalysis, LlmError> {
        let prompt = format!(
            "Look for attack techniques (injection, overflow, tunneling, known tooling) in this \
packet summary:\n{}\n\nRespond with JSON: {}",
            to_json(&self.summarize(records))?,
            PACKET_SCHEMA
        );
        let text = self.ask(prompt).await?;
        Ok(parse_packet_analysis(&text)?)
    }

    pub async fn generate_threat_report<T: Serialize + Sync>(
        &self,
        analysis: &T,
    ) -> Result<ThreatReport, LlmError> {
        let prompt = format!(
            "Write a threat report for these security findings:\n{}\n\nRespond with JSON: {}",
            to_json(analysis)?,
            REPORT_SCHEMA
        );
        let text = self.ask(prompt).await?;
        Ok(parse_threat_report(&text)?)
    }

    async fn ask(&self, prompt: String) -> Result<String, LlmError> {
        self.provider
            .complete_json(vec![Message::system(SYSTEM_ANALYST), Message::user(prompt)])
            .await
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, LlmError> {
    serde_json::to_string_pretty(value).map_err(|e| LlmError::Parse(e.to_string()))
}
