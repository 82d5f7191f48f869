//! Line client: one request line out, one response line in.
//!
//! [`LineClient`] opens a local stream socket at a configured filesystem
//! path and hands back a [`Connection`]. A connection accepts exactly one
//! request and then reads the response one byte at a time until a newline
//! or end-of-stream, never consuming past the delimiter.
//!
//! ## State machine
//!
//! ```text
//! Open --send--> AwaitingResponse --first byte--> Accumulating --\n--> LineComplete
//! AwaitingResponse | Accumulating --EOF--> StreamClosed
//! ```
//!
//! `LineComplete` and `StreamClosed` are terminal. Any failure moves the
//! connection to `Failed`. The transport is closed when the [`Connection`]
//! is dropped, whichever path ended the exchange.

use std::borrow::Cow;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use interprocess::local_socket::tokio::{prelude::*, Stream};
use interprocess::local_socket::{GenericFilePath, ToFsName};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ClientConfig;
use crate::framing::{LineAccumulator, Progress, MAX_LINE_BYTES};
use crate::request::Request;
use crate::{AppError, Result};

/// Lifecycle of a single [`Connection`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionState {
    /// Connected; no request sent yet.
    Open,
    /// Request flushed; no response byte read yet.
    AwaitingResponse,
    /// Reading response bytes.
    Accumulating,
    /// Newline received. Terminal.
    LineComplete,
    /// Peer closed the stream before a newline. Terminal.
    StreamClosed,
    /// A send or read failed, timed out, or was cancelled. Terminal.
    Failed,
}

impl ConnectionState {
    /// Whether no further operation is allowed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::LineComplete | Self::StreamClosed | Self::Failed)
    }
}

/// A response line read from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// Received bytes, delimiter excluded.
    pub bytes: Vec<u8>,
    /// True when the peer closed the stream instead of sending `\n`.
    pub saw_eof: bool,
}

impl ResponseLine {
    /// Line bytes decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Operator-facing rendering of the response.
    ///
    /// A complete line renders as its text. End-of-stream renders as
    /// `Got EOF`, followed on the next line by any partial bytes received,
    /// so an empty EOF is never mistaken for an empty answer.
    #[must_use]
    pub fn render(&self) -> String {
        if !self.saw_eof {
            return self.text().into_owned();
        }
        if self.bytes.is_empty() {
            "Got EOF".to_owned()
        } else {
            format!("Got EOF\n{}", self.text())
        }
    }
}

/// Read one line from `reader`, a byte at a time.
///
/// Stops at the first `\n` (not included in the result) or at end-of-stream,
/// whichever comes first. No byte after the delimiter is read.
///
/// # Errors
///
/// - `AppError::Read` if the underlying read fails.
/// - `AppError::LineTooLong` if more than `max_line_bytes` bytes arrive
///   before the delimiter (`0` disables the limit).
pub async fn read_line_from<R>(reader: &mut R, max_line_bytes: usize) -> Result<ResponseLine>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut state = ConnectionState::AwaitingResponse;
    read_line_tracked(reader, max_line_bytes, &mut state).await
}

/// Read loop that moves `state` to `Accumulating` once the first byte lands.
async fn read_line_tracked<R>(
    reader: &mut R,
    max_line_bytes: usize,
    state: &mut ConnectionState,
) -> Result<ResponseLine>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut acc = LineAccumulator::with_max_len(max_line_bytes);
    let mut byte = [0_u8; 1];

    loop {
        let read = reader
            .read(&mut byte)
            .await
            .map_err(|err| AppError::Read(err.to_string()))?;
        if read == 0 {
            return Ok(ResponseLine {
                bytes: acc.into_bytes(),
                saw_eof: true,
            });
        }
        *state = ConnectionState::Accumulating;
        if acc.push(byte[0])? == Progress::Complete {
            return Ok(ResponseLine {
                bytes: acc.into_bytes(),
                saw_eof: false,
            });
        }
    }
}

/// An exclusively owned stream connection carrying one exchange.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    state: ConnectionState,
    read_timeout: Option<Duration>,
    max_line_bytes: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream. Reads block forever by default.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ConnectionState::Open,
            read_timeout: None,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }

    /// Set the read deadline; `None` waits forever.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Set the response length limit; `0` disables it.
    #[must_use]
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Write the request and flush it to the transport.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` if a request was already sent on this
    ///   connection; nothing is written.
    /// - `AppError::Write` if the transport rejects the write or flush.
    pub async fn send_request(&mut self, request: &Request) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(AppError::Protocol(format!(
                "cannot send request in state {:?}",
                self.state
            )));
        }

        let written = async {
            self.stream.write_all(request.as_bytes()).await?;
            self.stream.flush().await
        }
        .await;

        if let Err(err) = written {
            self.state = ConnectionState::Failed;
            return Err(AppError::Write(err.to_string()));
        }

        self.state = ConnectionState::AwaitingResponse;
        debug!(bytes = request.len(), "request sent");
        Ok(())
    }

    /// Read the response line, honouring the read deadline and `ct`.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol` if no request was sent or the response was
    ///   already read.
    /// - `AppError::Timeout` if the deadline elapses first.
    /// - `AppError::Cancelled` if `ct` is cancelled first.
    /// - `AppError::Read` or `AppError::LineTooLong` from the read loop.
    ///
    /// If the returned future is dropped before it completes, the state is
    /// left at `AwaitingResponse` when no byte was consumed (the read may be
    /// retried) or at `Accumulating` when a partial line was discarded
    /// (further reads are rejected).
    pub async fn read_line(&mut self, ct: &CancellationToken) -> Result<ResponseLine> {
        match self.state {
            ConnectionState::AwaitingResponse => {}
            ConnectionState::Open => {
                return Err(AppError::Protocol("no request sent yet".into()));
            }
            other => {
                return Err(AppError::Protocol(format!(
                    "cannot read response in state {other:?}"
                )));
            }
        }
        let read_timeout = self.read_timeout;
        let max_line_bytes = self.max_line_bytes;
        let read = with_deadline(
            read_timeout,
            read_line_tracked(&mut self.stream, max_line_bytes, &mut self.state),
        );
        let outcome = tokio::select! {
            () = ct.cancelled() => Err(AppError::Cancelled("read cancelled".into())),
            res = read => res,
        };

        match outcome {
            Ok(line) => {
                self.state = if line.saw_eof {
                    ConnectionState::StreamClosed
                } else {
                    ConnectionState::LineComplete
                };
                debug!(bytes = line.bytes.len(), saw_eof = line.saw_eof, "response read");
                Ok(line)
            }
            Err(err) => {
                self.state = ConnectionState::Failed;
                Err(err)
            }
        }
    }
}

async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| AppError::Timeout(format!("no complete line within {limit:?}")))?,
        None => fut.await,
    }
}

/// Client bound to one local socket endpoint.
#[derive(Debug, Clone)]
pub struct LineClient {
    socket_path: PathBuf,
    read_timeout: Option<Duration>,
    max_line_bytes: usize,
}

impl LineClient {
    /// Build a client from validated configuration.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            socket_path: config.socket_path.clone(),
            read_timeout: config.read_timeout(),
            max_line_bytes: config.max_line_bytes,
        }
    }

    /// Endpoint this client connects to.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Open a stream connection to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connect` if the path is not a valid socket name,
    /// does not exist, or has no listener bound.
    pub async fn connect(&self) -> Result<Connection<Stream>> {
        let path = self.socket_path.display();
        let name = self
            .socket_path
            .as_path()
            .to_fs_name::<GenericFilePath>()
            .map_err(|err| AppError::Connect(format!("invalid socket path '{path}': {err}")))?;

        let stream = Stream::connect(name)
            .await
            .map_err(|err| AppError::Connect(format!("cannot connect to '{path}': {err}")))?;

        info!(socket = %path, "connected");
        Ok(Connection::new(stream)
            .with_read_timeout(self.read_timeout)
            .with_max_line_bytes(self.max_line_bytes))
    }

    /// Connect, send `request`, and read the response line.
    ///
    /// The connection is released before this returns, on success and on
    /// every error path.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from [`LineClient::connect`],
    /// [`Connection::send_request`], or [`Connection::read_line`].
    pub async fn exchange(
        &self,
        request: &Request,
        ct: &CancellationToken,
    ) -> Result<ResponseLine> {
        let span = info_span!("exchange", socket = %self.socket_path.display());
        async move {
            let mut conn = self.connect().await?;
            conn.send_request(request).await?;
            let line = conn.read_line(ct).await;
            if let Err(ref err) = line {
                warn!(%err, "exchange failed");
            }
            line
        }
        .instrument(span)
        .await
    }
}
