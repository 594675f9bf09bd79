use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logic::ingest::ConnectionRecord;
use crate::logic::llm::{
    ActivityClass, LlmError, LlmProvider, Message, Role, SchemaError, SemanticAnalyzer,
    SemanticSeverity,
};

/// Replies with a canned body and remembers the prompts it saw
struct ScriptedProvider {
    reply: String,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete_json(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        self.seen.lock().push(messages);
        Ok(self.reply.clone())
    }
}

fn records(n: usize) -> Vec<ConnectionRecord> {
    (0..n)
        .map(|i| ConnectionRecord {
            src_ip: "10.0.0.5".into(),
            dst_ip: "10.0.0.1".into(),
            dst_port: 1000 + i as u16,
            protocol: "tcp".into(),
            ..Default::default()
        })
        .collect()
}

#[tokio::test]
async fn test_analyze_traffic_round_trip() {
    let provider = ScriptedProvider::new(
        r#"{"anomaly_detected":true,"confidence":0.9,"anomaly_type":"port_scan",
            "description":"sweep","severity":"high","source_ips":["10.0.0.5"],
            "target_ips":[],"recommended_action":"block"}"#,
    );
    let analyzer = SemanticAnalyzer::new(provider.clone(), 100);

    let summary = analyzer.summarize(&records(30));
    let result = analyzer.analyze_traffic(&summary).await.unwrap();
    assert!(result.anomaly_detected);
    assert_eq!(result.severity, SemanticSeverity::High);

    let seen = provider.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].role, Role::System);
    assert!(seen[0][1].content.contains("protocol_distribution"));
}

#[tokio::test]
async fn test_schema_violation_is_an_error() {
    let provider = ScriptedProvider::new(r#"{"anomaly_detected":true}"#);
    let analyzer = SemanticAnalyzer::new(provider, 100);

    let err = analyzer.analyze_traffic(&serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, LlmError::Schema(SchemaError::Missing("confidence"))));
}

#[tokio::test]
async fn test_classify_activity_caps_sample() {
    let provider = ScriptedProvider::new(
        r#"{"classification":"suspicious","anomaly_detected":true,"pattern_description":"p",
            "severity":"low","recommended_action":"investigate","confidence":0.4}"#,
    );
    let analyzer = SemanticAnalyzer::new(provider.clone(), 5);

    let result = analyzer.classify_activity(&records(50)).await.unwrap();
    assert_eq!(result.classification, ActivityClass::Suspicious);

    let seen = provider.seen.lock();
    let prompt = &seen[0][1].content;
    assert!(prompt.contains("\"dst_port\": 1004"));
    assert!(!prompt.contains("\"dst_port\": 1005"));
}

#[tokio::test]
async fn test_packets_and_report() {
    let packets = SemanticAnalyzer::new(
        ScriptedProvider::new(r#"{"threats_detected":true,"analysis":"nmap","techniques":["scan"]}"#),
        100,
    );
    let analysis = packets.analyze_packets(&records(3)).await.unwrap();
    assert_eq!(analysis.techniques, vec!["scan"]);

    let reporter = SemanticAnalyzer::new(
        ScriptedProvider::new(
            r#"{"summary":"s","risk_level":"high","detailed_findings":[],"remediation_steps":["block"],"prevention_guidance":["mfa"]}"#,
        ),
        100,
    );
    let report = reporter.generate_threat_report(&analysis).await.unwrap();
    assert_eq!(report.risk_level, SemanticSeverity::High);
    assert_eq!(report.prevention_guidance, vec!["mfa"]);
}
