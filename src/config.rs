//! Client configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::framing::MAX_LINE_BYTES;
use crate::request::{Request, DEFAULT_REQUEST};
use crate::{AppError, Result};

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/cserver.sock")
}

fn default_request() -> String {
    DEFAULT_REQUEST.into()
}

fn default_max_line_bytes() -> usize {
    MAX_LINE_BYTES
}

/// Values supplied on the command line, layered over file or default config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces `socket_path`.
    pub socket_path: Option<PathBuf>,
    /// Replaces `request`; a trailing newline is appended when missing.
    pub request: Option<String>,
    /// Replaces `read_timeout_seconds`.
    pub read_timeout_seconds: Option<u64>,
}

/// Client configuration parsed from a TOML file.
///
/// Every field has a default, so an empty document yields the reference
/// behaviour: connect to `/tmp/cserver.sock`, send `100 + 2 102`, and wait
/// for the answer without a deadline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ClientConfig {
    /// Filesystem path of the listening Unix domain socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    /// Request line sent to the peer, trailing newline included.
    #[serde(default = "default_request")]
    pub request: String,
    /// Read deadline in seconds; 0 means wait forever.
    #[serde(default)]
    pub read_timeout_seconds: u64,
    /// Maximum response line length; 0 means unlimited.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            request: default_request(),
            read_timeout_seconds: 0,
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path` (or start from defaults when `None`), then
    /// apply `overrides` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be loaded or the merged
    /// configuration is invalid.
    pub fn resolve(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    /// Layer command-line values over this configuration and re-validate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the override request holds an interior
    /// newline or the merged configuration fails validation.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(ref socket_path) = overrides.socket_path {
            self.socket_path.clone_from(socket_path);
        }
        if let Some(ref line) = overrides.request {
            let request = Request::from_line(line)?;
            self.request = String::from_utf8_lossy(request.as_bytes()).into_owned();
        }
        if let Some(seconds) = overrides.read_timeout_seconds {
            self.read_timeout_seconds = seconds;
        }
        self.validate()
    }

    /// Check field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the socket path is empty or the request
    /// is not a single newline-terminated line.
    pub fn validate(&self) -> Result<()> {
        if self.socket_path.as_os_str().is_empty() {
            return Err(AppError::Config("socket_path must not be empty".into()));
        }
        self.request_payload()?;
        Ok(())
    }

    /// Validated request payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `request` is not a single line ending
    /// in `\n`.
    pub fn request_payload(&self) -> Result<Request> {
        Request::new(self.request.as_bytes())
    }

    /// Read deadline, or `None` when reads may block forever.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_seconds > 0).then(|| Duration::from_secs(self.read_timeout_seconds))
    }
}
