//! LLM Module - Semantic analysis backend
//!
//! # Components
//! - `provider.rs`: LlmProvider trait, Message, LlmError
//! - `openai.rs`: OpenAI-compatible provider (JSON-object mode)
//! - `schema.rs`: the four response schemas and their validation
//! - `summary.rs`: bounded batch summary sent with traffic requests
//! - `analyzer.rs`: typed operations (traffic, activity, packets, report)

pub mod analyzer;
pub mod openai;
pub mod provider;
pub mod schema;
pub mod summary;

#[cfg(test)]
mod tests;

pub use analyzer::SemanticAnalyzer;
pub use openai::OpenAiProvider;
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use schema::{
    ActivityClass, ActivityClassification, PacketAnalysis, SchemaError, SemanticSeverity,
    ThreatReport, TrafficAnalysis,
};
pub use summary::BatchSummary;
