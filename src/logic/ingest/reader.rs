//! Log Reader
//!
//! Lazy, restartable sequence of RawEvents over a text log.
//! Order = file order. Unreadable lines are skipped, not fatal.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use super::auth_log::parse_failed_password;
use super::types::RawEvent;
use super::IngestError;

pub struct LogReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl LogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let lines = Self::open_lines(&path)?;
        Ok(Self { path, lines, line_no: 0 })
    }

    fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>, IngestError> {
        let file = File::open(path).map_err(|source| IngestError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(BufReader::new(file).lines())
    }

    /// Rewind to the start of the file (re-opens it, so rotated files are picked up)
    pub fn restart(&mut self) -> Result<(), IngestError> {
        self.lines = Self::open_lines(&self.path)?;
        self.line_no = 0;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next raw line, skipping undecodable ones
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let next = self.lines.next()?;
            self.line_no += 1;
            match next {
                Ok(line) => return Some(line),
                Err(e) => {
                    log::debug!("{}:{} skipped ({})", self.path.display(), self.line_no, e);
                }
            }
        }
    }
}

impl Iterator for LogReader {
    type Item = RawEvent;

    fn next(&mut self) -> Option<RawEvent> {
        loop {
            let line = self.next_line()?;
            if let Some(event) = parse_failed_password(&line) {
                return Some(event);
            }
        }
    }
}
