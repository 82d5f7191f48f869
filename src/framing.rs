//! Newline framing for response lines.
//!
//! [`LineAccumulator`] is the I/O-free half of the read loop: bytes go in one
//! at a time (or as a chunk) and the accumulator reports when the delimiter
//! has been seen. The delimiter itself is never stored, and nothing after it
//! is consumed, so a caller can stop reading at exactly the right byte.

use crate::{AppError, Result};

/// Byte that terminates a line in both directions.
pub const DELIMITER: u8 = b'\n';

/// Default upper bound for a single response line: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Outcome of pushing one byte into a [`LineAccumulator`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Progress {
    /// The byte was appended; the line is still open.
    Pending,
    /// The delimiter arrived; the line is complete.
    Complete,
}

/// Accumulates response bytes until the newline delimiter.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buf: Vec<u8>,
    max_len: Option<usize>,
    complete: bool,
}

impl LineAccumulator {
    /// Create an accumulator without a length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator that rejects lines longer than `max_len` bytes.
    ///
    /// A `max_len` of `0` disables the limit.
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            max_len: (max_len > 0).then_some(max_len),
            ..Self::default()
        }
    }

    /// Push a single byte.
    ///
    /// Every byte other than [`DELIMITER`] is appended verbatim, control
    /// characters included.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` if the line was already complete.
    /// - `AppError::LineTooLong` if appending would exceed the limit.
    pub fn push(&mut self, byte: u8) -> Result<Progress> {
        if self.complete {
            return Err(AppError::Protocol("line already complete".into()));
        }
        if byte == DELIMITER {
            self.complete = true;
            return Ok(Progress::Complete);
        }
        if let Some(max) = self.max_len {
            if self.buf.len() >= max {
                return Err(AppError::LineTooLong(format!("exceeded {max} bytes")));
            }
        }
        self.buf.push(byte);
        Ok(Progress::Pending)
    }

    /// Push a chunk of bytes, stopping at the delimiter.
    ///
    /// Returns `Some(n)` when the delimiter was found, where `n` counts the
    /// consumed bytes including the delimiter; `chunk[n..]` was left
    /// untouched. Returns `None` when the whole chunk was consumed without
    /// completing the line.
    ///
    /// # Errors
    ///
    /// Same as [`LineAccumulator::push`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<usize>> {
        for (idx, &byte) in chunk.iter().enumerate() {
            if self.push(byte)? == Progress::Complete {
                return Ok(Some(idx + 1));
            }
        }
        Ok(None)
    }

    /// Whether the delimiter has been seen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of accumulated bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no byte has been accumulated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Accumulated bytes so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the accumulator and return the line bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
