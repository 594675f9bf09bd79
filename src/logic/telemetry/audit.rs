//! Audit Sink
//!
//! Append-only timestamped text lines, one per decision outcome plus
//! diagnostics. Independent of the `log` level.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use parking_lot::Mutex;

/// Tag written after the timestamp on every line
pub const AUDIT_TAG: &str = "threatwatch";

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to open audit log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write audit line: {0}")]
    Write(#[from] std::io::Error),
}

pub trait AuditSink: Send + Sync {
    fn record(&self, message: &str) -> Result<(), AuditError>;
}

/// `2024/03/10 12:00:01 threatwatch: message`
pub fn format_line(at: DateTime<Local>, message: &str) -> String {
    format!("{} {}: {}", at.format("%Y/%m/%d %H:%M:%S"), AUDIT_TAG, message)
}

// ============================================================================
// FILE SINK
// ============================================================================

pub struct FileAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    lines: AtomicU64,
}

impl FileAuditSink {
    /// Open for appending, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| AuditError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        log::info!("Audit log: {:?}", path);
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            lines: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines.load(Ordering::SeqCst)
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, message: &str) -> Result<(), AuditError> {
        let line = format_line(Local::now(), message);
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Flush for durability
        writer.flush()?;
        self.lines.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MEMORY SINK
// ============================================================================

/// Keeps raw messages in memory (dry runs and tests)
#[derive(Default)]
pub struct MemoryAuditSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, message: &str) -> Result<(), AuditError> {
        self.lines.lock().push(message.to_string());
        Ok(())
    }
}
