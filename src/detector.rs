// src/detector.rs - Landmark detector boundary and a recorded-stream replay source
use crate::landmarks::Frame;
use std::io::BufRead;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("failed to read landmark stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed frame record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of per-frame hand observations (a live landmark model or a recording).
pub trait HandDetector {
    /// `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, DetectorError>;
}

/// Replays frames recorded as one JSON `Frame` per line. Blank lines are skipped.
pub struct ReplayDetector<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> ReplayDetector<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> HandDetector for ReplayDetector<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, DetectorError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let record = self.buf.trim();
            if record.is_empty() {
                continue;
            }
            return serde_json::from_str(record)
                .map(Some)
                .map_err(|source| DetectorError::Parse { line: self.line, source });
        }
    }
}
