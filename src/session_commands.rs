//! Session-level commands: transaction control, pub/sub membership, AUTH and
//! ACL, the master-side replication handshake, and WAIT. These run inline on
//! the session task and write their own replies; only EXEC touches the
//! dispatch loop, by enqueueing the queued batch.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::commands::CommandError;
use crate::resp::{RespValue, encode_rdb_payload};
use crate::server::Shared;
use crate::session::{Session, SharedWriter, respond, write_to_stream};

/// The empty RDB snapshot served to replicas on FULLRESYNC (REDIS0011 with
/// no keys), as a hex string.
const EMPTY_RDB_HEX: &str = "524544495330303131fa0972656469732d76657205372e322e30fa0a72656469\
732d62697473c040fe00fb0000ff77de0394ac9d23ea";

pub fn is_session_command(name: &str) -> bool {
    matches!(
        name,
        "MULTI"
            | "EXEC"
            | "DISCARD"
            | "SUBSCRIBE"
            | "UNSUBSCRIBE"
            | "AUTH"
            | "ACL"
            | "REPLCONF"
            | "PSYNC"
            | "WAIT"
    )
}

pub async fn execute_session_command(
    name: &str,
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    match name {
        "MULTI" => multi(session, writer).await,
        "EXEC" => exec(session, writer, shared).await,
        "DISCARD" => discard(session, writer).await,
        "SUBSCRIBE" => subscribe(args, session, writer, shared).await,
        "UNSUBSCRIBE" => unsubscribe(args, session, writer, shared).await,
        "AUTH" => auth(args, session, writer, shared).await,
        "ACL" => acl(args, session, writer, shared).await,
        "REPLCONF" => replconf(args, session, writer, shared).await,
        "PSYNC" => psync(args, session, writer, shared).await,
        "WAIT" => wait(args, session, writer, shared).await,
        _ => respond(
            session,
            writer,
            &CommandError::UnknownCommand(name.to_string()).to_resp(),
        )
        .await,
    }
}

async fn multi(session: &mut Session, writer: &SharedWriter) {
    if session.in_transaction {
        respond(session, writer, &CommandError::NestedMulti.to_resp()).await;
        return;
    }

    session.in_transaction = true;
    respond(session, writer, &ok()).await;
}

async fn exec(session: &mut Session, writer: &SharedWriter, shared: &Arc<Shared>) {
    if !session.in_transaction {
        respond(session, writer, &CommandError::ExecWithoutMulti.to_resp()).await;
        return;
    }

    session.in_transaction = false;
    let commands = std::mem::take(&mut session.queued_commands);

    let reply_rx = shared.dispatch.enqueue_transaction(commands).await;
    match reply_rx.await {
        Ok(reply) => respond(session, writer, &reply).await,
        Err(_) => debug!(session = session.id, "transaction reply channel dropped"),
    }
}

async fn discard(session: &mut Session, writer: &SharedWriter) {
    if !session.in_transaction {
        respond(session, writer, &CommandError::DiscardWithoutMulti.to_resp()).await;
        return;
    }

    session.in_transaction = false;
    session.queued_commands.clear();
    respond(session, writer, &ok()).await;
}

async fn subscribe(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    if args.is_empty() {
        respond(session, writer, &CommandError::WrongArity("subscribe").to_resp()).await;
        return;
    }

    for channel in args {
        let count = shared
            .pubsub
            .subscribe(session.id, channel, Arc::clone(writer))
            .await;
        session.subscribed_channels.insert(channel.clone());

        let confirmation = RespValue::Array(vec![
            RespValue::BulkString("subscribe".to_string()),
            RespValue::BulkString(channel.clone()),
            RespValue::Integer(count as i64),
        ]);
        respond(session, writer, &confirmation.encode()).await;
    }
}

async fn unsubscribe(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let channels: Vec<String> = if args.is_empty() {
        session.subscribed_channels.iter().cloned().collect()
    } else {
        args.to_vec()
    };

    if channels.is_empty() {
        let confirmation = RespValue::Array(vec![
            RespValue::BulkString("unsubscribe".to_string()),
            RespValue::NullBulkString,
            RespValue::Integer(0),
        ]);
        respond(session, writer, &confirmation.encode()).await;
        return;
    }

    for channel in channels {
        let count = shared.pubsub.unsubscribe(session.id, &channel).await;
        session.subscribed_channels.remove(&channel);

        let confirmation = RespValue::Array(vec![
            RespValue::BulkString("unsubscribe".to_string()),
            RespValue::BulkString(channel),
            RespValue::Integer(count as i64),
        ]);
        respond(session, writer, &confirmation.encode()).await;
    }
}

async fn auth(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let [username, password] = args else {
        respond(session, writer, &CommandError::WrongArity("auth").to_resp()).await;
        return;
    };

    match shared.acl.authenticate(username, password) {
        Ok(()) => {
            session.username = username.clone();
            respond(session, writer, &ok()).await;
        }
        Err(auth_error) => respond(session, writer, &auth_error.to_resp()).await,
    }
}

async fn acl(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let Some(subcommand) = args.first() else {
        respond(session, writer, &CommandError::WrongArity("acl").to_resp()).await;
        return;
    };

    match subcommand.to_uppercase().as_str() {
        "WHOAMI" => {
            respond(
                session,
                writer,
                &RespValue::BulkString(session.username.clone()).encode(),
            )
            .await;
        }
        "GETUSER" => {
            let target = args
                .get(1)
                .map(String::as_str)
                .unwrap_or(session.username.as_str());

            match shared.acl.get_user(target) {
                Some(user) => {
                    let details = RespValue::Array(vec![
                        RespValue::BulkString("flags".to_string()),
                        RespValue::command_array(user.flags),
                        RespValue::BulkString("passwords".to_string()),
                        RespValue::command_array(user.passwords),
                    ]);
                    respond(session, writer, &details.encode()).await;
                }
                None => {
                    respond(session, writer, &CommandError::UserNotFound.to_resp()).await;
                }
            }
        }
        "SETUSER" => {
            let (Some(username), Some(rule)) = (args.get(1), args.get(2)) else {
                respond(session, writer, &CommandError::WrongArity("acl").to_resp()).await;
                return;
            };

            // Only the ">password" rule is supported.
            let Some(password) = rule.strip_prefix('>') else {
                respond(
                    session,
                    writer,
                    &CommandError::InvalidArgument(format!(
                        "unsupported ACL SETUSER rule '{}'",
                        rule
                    ))
                    .to_resp(),
                )
                .await;
                return;
            };

            match shared.acl.set_user_password(username, password) {
                Ok(()) => respond(session, writer, &ok()).await,
                Err(acl_error) => respond(session, writer, &acl_error.to_resp()).await,
            }
        }
        unknown => {
            respond(
                session,
                writer,
                &CommandError::InvalidArgument(format!("unknown ACL subcommand '{}'", unknown))
                    .to_resp(),
            )
            .await;
        }
    }
}

/// REPLCONF has two faces: on the master it accumulates the connecting
/// replica's descriptor (listening-port, capa) and consumes ACK reports; on
/// a replica's master link, GETACK must answer with the local offset even
/// though every other reply is suppressed.
async fn replconf(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let Some(subcommand) = args.first() else {
        respond(session, writer, &CommandError::WrongArity("replconf").to_resp()).await;
        return;
    };

    match subcommand.to_lowercase().as_str() {
        "listening-port" => {
            let Some(port) = args.get(1).and_then(|raw| raw.parse::<u16>().ok()) else {
                respond(session, writer, &CommandError::NotAnInteger.to_resp()).await;
                return;
            };

            shared
                .replication
                .ensure_replica(session.id, Arc::clone(writer))
                .await;
            shared.replication.set_listening_port(session.id, port).await;
            respond(session, writer, &ok()).await;
        }
        "capa" => {
            shared
                .replication
                .ensure_replica(session.id, Arc::clone(writer))
                .await;
            for capability in &args[1..] {
                shared
                    .replication
                    .add_capability(session.id, capability.clone())
                    .await;
            }
            respond(session, writer, &ok()).await;
        }
        "getack" => {
            let ack = RespValue::encode_array_from_strings(vec![
                "REPLCONF".to_string(),
                "ACK".to_string(),
                session.master_link_offset.to_string(),
            ]);

            // Suppression is bypassed for exactly this reply.
            if let Err(write_error) = write_to_stream(writer, ack.as_bytes()).await {
                warn!(session = session.id, error = %write_error, "failed to send ACK");
            }
        }
        "ack" => {
            let Some(offset) = args.get(1).and_then(|raw| raw.parse::<u64>().ok()) else {
                return;
            };

            debug!(session = session.id, offset, "replica acknowledged");
            shared.replication.record_ack(session.id, offset).await;
            // ACK gets no reply.
        }
        _ => respond(session, writer, &ok()).await,
    }
}

/// PSYNC: reply `+FULLRESYNC <replid> 0`, stream the RDB snapshot as a raw
/// bulk, and from then on the replica receives propagated writes.
async fn psync(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    if args.len() != 2 {
        respond(session, writer, &CommandError::WrongArity("psync").to_resp()).await;
        return;
    }

    let full_resync = RespValue::SimpleString(format!(
        "FULLRESYNC {} {}",
        shared.replication.repl_id(),
        shared.replication.master_offset(),
    ));

    if let Err(write_error) = write_to_stream(writer, full_resync.encode().as_bytes()).await {
        warn!(session = session.id, error = %write_error, "failed to send FULLRESYNC");
        return;
    }

    let snapshot = decode_hex(EMPTY_RDB_HEX);
    if let Err(write_error) =
        write_to_stream(writer, &encode_rdb_payload(&snapshot)).await
    {
        warn!(session = session.id, error = %write_error, "failed to send RDB snapshot");
        return;
    }

    shared
        .replication
        .ensure_replica(session.id, Arc::clone(writer))
        .await;
    shared.replication.mark_handshake_complete(session.id).await;

    info!(session = session.id, addr = %session.addr, "replica handshake complete");
}

async fn wait(
    args: &[String],
    session: &mut Session,
    writer: &SharedWriter,
    shared: &Arc<Shared>,
) {
    let [min_replicas, timeout_ms] = args else {
        respond(session, writer, &CommandError::WrongArity("wait").to_resp()).await;
        return;
    };

    let (Ok(min_replicas), Ok(timeout_ms)) =
        (min_replicas.parse::<usize>(), timeout_ms.parse::<u64>())
    else {
        respond(session, writer, &CommandError::NotAnInteger.to_resp()).await;
        return;
    };

    let acknowledged = shared.replication.wait_for_acks(min_replicas, timeout_ms).await;
    respond(
        session,
        writer,
        &RespValue::Integer(acknowledged as i64).encode(),
    )
    .await;
}

fn ok() -> String {
    RespValue::SimpleString("OK".to_string()).encode()
}

fn decode_hex(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks(2)
        .filter_map(|pair| {
            let high = (pair[0] as char).to_digit(16)?;
            let low = (pair[1] as char).to_digit(16)?;
            Some((high * 16 + low) as u8)
        })
        .collect()
}
