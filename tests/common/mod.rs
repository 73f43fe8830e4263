//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;

use denyfile_server::config::ServerConfig;
use denyfile_server::{HttpServer, Shutdown};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A running server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<ServerConfig>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the server; the listener is bound before this returns.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestServer {
        addr,
        updates,
        shutdown,
    }
}

/// Config serving `root` with the given marker settings at main scope.
pub fn config_for(root: &Path, denyfile: &str, recursive: bool) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.directives.root = Some(root.to_str().unwrap().to_string());
    config.directives.denyfile = Some(denyfile.to_string());
    config.directives.denyfile_recursive = Some(recursive);
    config
}

/// Document root layout:
///
/// ```text
/// index.html
/// public/index.html
/// public/page.html
/// private/.deny
/// private/page.html
/// private/deep/page.html
/// ```
pub fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for (file, body) in [
        ("index.html", "home"),
        ("public/index.html", "public index"),
        ("public/page.html", "public page"),
        ("private/.deny", ""),
        ("private/page.html", "private page"),
        ("private/deep/page.html", "deep page"),
    ] {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }
    dir
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send a raw GET so the path and Host header reach the server untouched.
/// Returns the status code.
pub async fn raw_get(addr: SocketAddr, path: &str, host: &str) -> u16 {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host
    );
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or_else(|| panic!("malformed response: {:?}", response))
}
