//! Shared harness for the end-to-end tests: spawn a real server on an
//! ephemeral port and talk to it over TCP with raw RESP.
#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use rudis::config::{Role, ServerConfig};
use rudis::resp::RespValue;
use rudis::server::Server;

/// Picks a free port by binding to port zero and releasing it right away.
pub async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Spawns a master server and waits until it accepts connections.
pub async fn spawn_master() -> u16 {
    let port = free_port().await;
    let mut config = ServerConfig::default();
    config.port = port;

    spawn_server(config).await;
    port
}

/// Spawns a replica of `master_port` and gives the handshake time to finish.
pub async fn spawn_replica(master_port: u16) -> u16 {
    let port = free_port().await;
    let mut config = ServerConfig::default();
    config.port = port;
    config.role = Role::Replica("127.0.0.1".to_string(), master_port);

    spawn_server(config).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    port
}

pub async fn spawn_server(config: ServerConfig) {
    let port = config.port;
    tokio::spawn(async move {
        let _ = Server::new(config).run().await;
    });
    wait_for_listener(port).await;
}

async fn wait_for_listener(port: u16) {
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server on port {} never came up", port);
}

/// A test client that frames requests as RESP arrays and reads exactly one
/// complete reply frame at a time.
pub struct TestClient {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestClient {
    pub async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    pub async fn send(&mut self, parts: &[&str]) {
        let encoded = RespValue::encode_array_from_strings(parts.to_vec());
        self.stream.write_all(encoded.as_bytes()).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Sends raw bytes, useful for split-frame and pipelining cases.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Reads until one complete RESP frame is buffered and returns its raw
    /// bytes.
    pub async fn read_reply(&mut self) -> String {
        let mut read_buf = [0u8; 4096];

        loop {
            if let Ok(Some((_, consumed))) = RespValue::parse_frame(&self.buffer) {
                let frame: Vec<u8> = self.buffer.drain(..consumed).collect();
                return String::from_utf8(frame).unwrap();
            }

            let bytes_read = tokio::time::timeout(
                Duration::from_secs(5),
                self.stream.read(&mut read_buf),
            )
            .await
            .expect("timed out waiting for a reply")
            .unwrap();

            assert!(bytes_read > 0, "server closed the connection");
            self.buffer.extend_from_slice(&read_buf[..bytes_read]);
        }
    }

    pub async fn command(&mut self, parts: &[&str]) -> String {
        self.send(parts).await;
        self.read_reply().await
    }
}
