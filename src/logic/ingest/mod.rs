//! Ingest Module - Raw records from log sources
//!
//! # Components
//! - `types.rs`: RawEvent, Scalar, ConnectionRecord
//! - `auth_log.rs`: sshd failed-password pattern
//! - `reader.rs`: lazy, restartable log reader
//! - `alert.rs`: active-response trigger, connection record files

pub mod alert;
pub mod auth_log;
pub mod reader;
pub mod types;

pub use alert::{parse_active_response, read_connection_records, ActiveResponse};
pub use auth_log::parse_failed_password;
pub use reader::LogReader;
pub use types::{ConnectionRecord, FieldMap, RawEvent, Scalar};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("cannot open log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record: {0}")]
    Malformed(String),
}
