//! The outbound replica link: dial the master, run the
//! PING → REPLCONF → PSYNC handshake, swallow the RDB snapshot, then hand
//! the connection to the ordinary session loop as a suppressed master-link
//! session. Bytes read past the snapshot are the first replicated commands
//! and are carried into that loop.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::resp::{RespError, RespValue};
use crate::server::Shared;
use crate::session::{Session, run_session};

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("failed to reach master: {0}")]
    Dial(String),
    #[error("I/O error during handshake: {0}")]
    Io(#[from] tokio::io::Error),
    #[error("master closed the connection")]
    ConnectionClosed,
    #[error("malformed reply from master")]
    Resp(#[from] RespError),
    #[error("unexpected reply from master: {0}")]
    UnexpectedReply(String),
    #[error("invalid FULLRESYNC reply from master")]
    InvalidFullResync,
}

/// Runs the replica link for the lifetime of the process. On handshake
/// failure the replica keeps serving reads from whatever it has; it just
/// never sees master writes.
pub async fn start_replica_link(shared: Arc<Shared>, master_host: String, master_port: u16) {
    let master_addr = format!("{}:{}", master_host, master_port);

    match establish_master_link(&shared, &master_addr).await {
        Ok((stream, leftover)) => {
            info!(master = %master_addr, "replication handshake complete");

            let (reader, writer) = stream.into_split();
            let writer = Arc::new(RwLock::new(writer));
            let session = Session::master_link(master_addr);

            run_session(reader, writer, session, shared, leftover).await;
        }
        Err(handshake_error) => {
            error!(master = %master_addr, error = %handshake_error, "replication handshake failed");
        }
    }
}

async fn establish_master_link(
    shared: &Arc<Shared>,
    master_addr: &str,
) -> Result<(TcpStream, BytesMut), HandshakeError> {
    let mut stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(master_addr))
        .await
        .map_err(|_| HandshakeError::Dial("connect timed out".to_string()))?
        .map_err(|err| HandshakeError::Dial(err.to_string()))?;

    let mut buffer = BytesMut::new();

    let reply = send_handshake_command(&mut stream, &mut buffer, vec!["PING"]).await?;
    expect_simple(&reply, "PONG")?;

    let listening_port = shared.config.port.to_string();
    let reply = send_handshake_command(
        &mut stream,
        &mut buffer,
        vec!["REPLCONF", "listening-port", listening_port.as_str()],
    )
    .await?;
    expect_simple(&reply, "OK")?;

    let reply =
        send_handshake_command(&mut stream, &mut buffer, vec!["REPLCONF", "capa", "psync2"])
            .await?;
    expect_simple(&reply, "OK")?;

    let reply = send_handshake_command(&mut stream, &mut buffer, vec!["PSYNC", "?", "-1"]).await?;
    validate_full_resync(&reply)?;

    // The raw-bulk RDB snapshot follows the FULLRESYNC line. It carries no
    // trailing CRLF, so the generic frame parser cannot be used here.
    let snapshot = read_rdb_payload(&mut stream, &mut buffer).await?;
    debug!(bytes = snapshot.len(), "received RDB snapshot from master");

    Ok((stream, buffer))
}

async fn send_handshake_command(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
    parts: Vec<&str>,
) -> Result<RespValue, HandshakeError> {
    let encoded = RespValue::encode_array_from_strings(parts);
    stream.write_all(encoded.as_bytes()).await?;
    stream.flush().await?;

    read_frame(stream, buffer).await
}

/// Reads from the socket until one complete frame is buffered, consuming
/// only that frame. Handshake replies and replicated commands can land in
/// the same read; the remainder stays in the buffer.
async fn read_frame(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
) -> Result<RespValue, HandshakeError> {
    let mut read_buf = [0u8; 4096];

    loop {
        if let Some((frame, consumed)) = RespValue::parse_frame(buffer)? {
            buffer.advance(consumed);
            return Ok(frame);
        }

        let bytes_read = stream.read(&mut read_buf).await?;
        if bytes_read == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
        buffer.extend_from_slice(&read_buf[..bytes_read]);
    }
}

async fn read_rdb_payload(
    stream: &mut TcpStream,
    buffer: &mut BytesMut,
) -> Result<Vec<u8>, HandshakeError> {
    let mut read_buf = [0u8; 4096];

    loop {
        if let Some(header_end) = buffer.windows(2).position(|window| window == b"\r\n") {
            if buffer.first() != Some(&b'$') {
                return Err(HandshakeError::InvalidFullResync);
            }

            let length = str::from_utf8(&buffer[1..header_end])
                .map_err(|_| HandshakeError::InvalidFullResync)?
                .parse::<usize>()
                .map_err(|_| HandshakeError::InvalidFullResync)?;

            let payload_end = header_end + 2 + length;
            while buffer.len() < payload_end {
                let bytes_read = stream.read(&mut read_buf).await?;
                if bytes_read == 0 {
                    return Err(HandshakeError::ConnectionClosed);
                }
                buffer.extend_from_slice(&read_buf[..bytes_read]);
            }

            let payload = buffer[header_end + 2..payload_end].to_vec();
            buffer.advance(payload_end);
            return Ok(payload);
        }

        let bytes_read = stream.read(&mut read_buf).await?;
        if bytes_read == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
        buffer.extend_from_slice(&read_buf[..bytes_read]);
    }
}

fn expect_simple(reply: &RespValue, expected: &str) -> Result<(), HandshakeError> {
    match reply {
        RespValue::SimpleString(content) if content == expected => Ok(()),
        other => Err(HandshakeError::UnexpectedReply(format!("{:?}", other))),
    }
}

/// The FULLRESYNC reply is `+FULLRESYNC <replid> <offset>` with a 40-char
/// alphanumeric replication id.
fn validate_full_resync(reply: &RespValue) -> Result<(), HandshakeError> {
    let RespValue::SimpleString(content) = reply else {
        return Err(HandshakeError::InvalidFullResync);
    };

    let parts: Vec<&str> = content.split_whitespace().collect();
    let ["FULLRESYNC", repl_id, offset] = parts.as_slice() else {
        return Err(HandshakeError::InvalidFullResync);
    };

    let repl_id_regex = Regex::new(r"^[a-zA-Z0-9]{40}$").unwrap();
    if !repl_id_regex.is_match(repl_id) {
        return Err(HandshakeError::InvalidFullResync);
    }

    offset
        .parse::<i64>()
        .map_err(|_| HandshakeError::InvalidFullResync)?;

    Ok(())
}
