use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::command::QueuedCommand;
use crate::commands::{CommandError, is_write_command};
use crate::config::Role;
use crate::resp::RespValue;
use crate::server::Shared;
use crate::session_commands::{execute_session_command, is_session_command};

const READ_BUFFER_SIZE: usize = 4096;

/// Commands a subscribed connection may still issue.
const PUBSUB_ALLOWED: [&str; 7] = [
    "SUBSCRIBE",
    "UNSUBSCRIBE",
    "PSUBSCRIBE",
    "PUNSUBSCRIBE",
    "PING",
    "QUIT",
    "RESET",
];

/// The socket write half, shared so the session loop, the pub/sub hub, and
/// the replication manager can all send on the same connection.
pub type SharedWriter = Arc<RwLock<OwnedWriteHalf>>;

pub async fn write_to_stream(writer: &SharedWriter, bytes: &[u8]) -> tokio::io::Result<()> {
    let mut writer_guard = writer.write().await;
    writer_guard.write_all(bytes).await?;
    writer_guard.flush().await
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection state. One session task owns it; nothing here is shared.
pub struct Session {
    pub id: u64,
    pub addr: String,
    pub username: String,
    pub in_transaction: bool,
    pub queued_commands: Vec<QueuedCommand>,
    pub subscribed_channels: HashSet<String>,
    /// Set on a replica's master link so ordinary replies are discarded.
    pub suppress_responses: bool,
    /// True when this session is the inbound master link on a replica.
    pub is_master_link: bool,
    /// Bytes of replicated commands processed so far (replica side only);
    /// reported in REPLCONF ACK.
    pub master_link_offset: u64,
}

impl Session {
    pub fn new(addr: String) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst),
            addr,
            username: crate::acl::DEFAULT_USER.to_string(),
            in_transaction: false,
            queued_commands: Vec::new(),
            subscribed_channels: HashSet::new(),
            suppress_responses: false,
            is_master_link: false,
            master_link_offset: 0,
        }
    }

    /// A session representing the master on a replica: replies to replicated
    /// commands are suppressed until REPLCONF GETACK breaks through.
    pub fn master_link(addr: String) -> Self {
        let mut session = Self::new(addr);
        session.is_master_link = true;
        session.suppress_responses = true;
        session
    }

    pub fn in_pubsub_mode(&self) -> bool {
        !self.subscribed_channels.is_empty()
    }
}

/// Entry point for an accepted client connection.
pub async fn handle_connection(stream: TcpStream, addr: String, shared: Arc<Shared>) {
    let (reader, writer) = stream.into_split();
    let writer = Arc::new(RwLock::new(writer));
    let session = Session::new(addr);

    run_session(reader, writer, session, shared, BytesMut::new()).await;
}

/// The session read loop: accumulate bytes, peel off complete frames, route
/// each one. `initial_buffer` carries any bytes read past the replication
/// handshake; they are the first replicated commands and are processed
/// before the first socket read.
pub async fn run_session(
    mut reader: OwnedReadHalf,
    writer: SharedWriter,
    mut session: Session,
    shared: Arc<Shared>,
    mut buffer: BytesMut,
) {
    debug!(session = session.id, addr = %session.addr, "session started");

    if !buffer.is_empty() {
        process_buffer(&mut buffer, &mut session, &writer, &shared).await;
    }

    let mut read_buf = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut read_buf).await {
            Ok(0) => break,
            Ok(bytes_read) => {
                buffer.extend_from_slice(&read_buf[..bytes_read]);
                process_buffer(&mut buffer, &mut session, &writer, &shared).await;
            }
            Err(err) => {
                debug!(session = session.id, error = %err, "read failed");
                break;
            }
        }
    }

    shared.pubsub.drop_session(session.id).await;
    shared.replication.remove_replica(session.id).await;

    debug!(session = session.id, addr = %session.addr, "session closed");
}

/// Peels every complete frame off the front of the buffer. Incomplete
/// trailing data stays put for the next read; malformed data gets an error
/// reply and the buffer is dropped so the connection can recover.
async fn process_buffer(
    buffer: &mut BytesMut,
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    loop {
        match RespValue::parse_frame(buffer) {
            Ok(Some((frame, consumed))) => {
                buffer.advance(consumed);
                route_frame(frame, session, writer, shared).await;

                // The replica counts every processed master frame after the
                // frame is routed, so a GETACK acknowledges everything
                // before itself.
                if session.is_master_link {
                    session.master_link_offset += consumed as u64;
                }
            }
            Ok(None) => break,
            Err(parse_error) => {
                respond(session, writer, &parse_error.to_resp()).await;
                buffer.clear();
                break;
            }
        }
    }
}

/// Routing precedence: open transaction queues the command; subscriber mode
/// filters; session commands run inline on this task; everything else is
/// enqueued for the dispatch loop and the reply awaited.
async fn route_frame(
    frame: RespValue,
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let (name, args) = match frame.flatten_command() {
        Ok(parts) => parts,
        Err(parse_error) => {
            respond(session, writer, &parse_error.to_resp()).await;
            return;
        }
    };

    if session.in_transaction && !matches!(name.as_str(), "EXEC" | "DISCARD" | "MULTI") {
        session.queued_commands.push(QueuedCommand { name, args });
        respond(
            session,
            writer,
            &RespValue::SimpleString("QUEUED".to_string()).encode(),
        )
        .await;
        return;
    }

    if session.in_pubsub_mode() {
        if name == "PING" {
            respond(session, writer, "*2\r\n$4\r\npong\r\n$0\r\n\r\n").await;
            return;
        }

        if !PUBSUB_ALLOWED.contains(&name.as_str()) {
            respond(
                session,
                writer,
                &CommandError::NotAllowedWhileSubscribed(name).to_resp(),
            )
            .await;
            return;
        }
    }

    if is_session_command(&name) {
        execute_session_command(&name, &args, session, writer, shared).await;
        return;
    }

    // Clients talking to a replica can only read; writes arrive solely over
    // the master link.
    if matches!(shared.config.role, Role::Replica(_, _))
        && !session.is_master_link
        && is_write_command(&name)
    {
        respond(session, writer, &CommandError::ReplicaReadOnly.to_resp()).await;
        return;
    }

    let reply_rx = shared.dispatch.enqueue_command(name, args).await;
    match reply_rx.await {
        Ok(reply) => respond(session, writer, &reply).await,
        Err(_) => debug!(session = session.id, "dispatch dropped the reply channel"),
    }
}

pub async fn respond(session: &Session, writer: &SharedWriter, payload: &str) {
    if session.suppress_responses || payload.is_empty() {
        return;
    }

    if let Err(write_error) = write_to_stream(writer, payload.as_bytes()).await {
        error!(session = session.id, error = %write_error, "failed to write reply");
    }
}
