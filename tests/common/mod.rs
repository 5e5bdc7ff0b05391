//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use base64::prelude::*;
use ecg_upload_server::config::{ResponseMode, UploadConfig};
use ecg_upload_server::http::UploadServer;
use ecg_upload_server::lifecycle::Shutdown;
use ecg_upload_server::net::Listener;

/// A running server plus the handle that stops it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

/// Config writing into `dir`, bound to an ephemeral port.
pub fn test_config(dir: &Path, mode: ResponseMode) -> UploadConfig {
    let mut config = UploadConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.output_dir = dir.to_path_buf();
    config.response.mode = mode;
    config
}

/// Start a server for `config` on an ephemeral port.
pub async fn start_server(config: UploadConfig) -> TestServer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections).unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = UploadServer::new(&config).with_drain_timeout(Duration::from_secs(2));
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// `Authorization` value for the default credentials.
#[allow(dead_code)]
pub fn default_auth() -> String {
    format!("Basic {}", BASE64_STANDARD.encode("admin:admin123"))
}

/// Send raw bytes, half-close, and collect everything until the server closes.
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}

/// Build an authenticated upload with an exact Content-Length.
#[allow(dead_code)]
pub fn upload_request(method: &str, path: &str, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nAuthorization: {}\r\nContent-Length: {}\r\n\r\n",
        default_auth(),
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}

/// Files currently in `dir`, sorted by name.
#[allow(dead_code)]
pub fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
