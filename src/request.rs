//! Request payload sent to the peer.
//!
//! A request is exactly one line: a byte sequence with a single trailing
//! `\n` and no interior newline.

use crate::framing::DELIMITER;
use crate::{AppError, Result};

/// Payload sent by the reference client: an arithmetic line for the peer.
pub const DEFAULT_REQUEST: &str = "100 + 2 102\n";

/// Validated, newline-terminated request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request(Vec<u8>);

impl Request {
    /// Build a request from raw bytes that already end with `\n`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `bytes` is empty, lacks the trailing
    /// newline, or contains a newline anywhere else.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let Some((&last, body)) = bytes.split_last() else {
            return Err(AppError::Config("request must not be empty".into()));
        };
        if last != DELIMITER {
            return Err(AppError::Config("request must end with a newline".into()));
        }
        if body.contains(&DELIMITER) {
            return Err(AppError::Config("request must be a single line".into()));
        }
        Ok(Self(bytes))
    }

    /// Build a request from a line of text, appending `\n` when missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `line` contains an interior newline.
    pub fn from_line(line: &str) -> Result<Self> {
        let mut bytes = line.as_bytes().to_vec();
        if bytes.last() != Some(&DELIMITER) {
            bytes.push(DELIMITER);
        }
        Self::new(bytes)
    }

    /// Wire bytes, trailing newline included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a request holds at least its delimiter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Request {
    fn default() -> Self {
        Self(DEFAULT_REQUEST.as_bytes().to_vec())
    }
}
