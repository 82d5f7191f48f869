//! Shared helpers for end-to-end tests against a real local socket.

use std::path::{Path, PathBuf};

use interprocess::local_socket::tokio::{prelude::*, Listener, Stream};
use interprocess::local_socket::{GenericFilePath, ListenerOptions, ToFsName};
use line_client::client::read_line_from;
use line_client::ClientConfig;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

/// Temporary directory plus the socket path inside it.
pub struct SocketDir {
    _dir: TempDir,
    pub path: PathBuf,
}

pub fn socket_dir() -> SocketDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("peer.sock");
    SocketDir { _dir: dir, path }
}

pub fn bind_listener(path: &Path) -> Listener {
    let name = path.to_fs_name::<GenericFilePath>().expect("valid socket name");
    ListenerOptions::new()
        .name(name)
        .create_tokio()
        .expect("bind listener")
}

pub fn config_for(path: &Path) -> ClientConfig {
    ClientConfig {
        socket_path: path.to_path_buf(),
        ..ClientConfig::default()
    }
}

/// Accept one connection, read the request line, and hand both back.
pub async fn accept_request(listener: &Listener) -> (Stream, Vec<u8>) {
    let mut stream = listener.accept().await.expect("accept");
    let request = read_line_from(&mut stream, 0).await.expect("read request");
    assert!(!request.saw_eof, "client must terminate its request with a newline");
    (stream, request.bytes)
}

/// Peer that answers every request with `reply` and closes.
pub fn spawn_replying_peer(
    listener: Listener,
    reply: &'static [u8],
) -> tokio::task::JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let (mut stream, request) = accept_request(&listener).await;
        stream.write_all(reply).await.expect("write reply");
        stream.flush().await.expect("flush reply");
        request
    })
}
