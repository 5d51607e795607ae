use crate::commands::{CommandError, HandlerOutcome};
use crate::replication::ReplicationManager;
use crate::resp::RespValue;

/// INFO: only the replication section is populated; asking for any other
/// section yields an empty bulk string, like Redis does.
pub async fn info(
    replication: &ReplicationManager,
    arguments: &[String],
) -> Result<HandlerOutcome, CommandError> {
    let section = match arguments {
        [] => None,
        [section] => Some(section.to_lowercase()),
        _ => return Err(CommandError::WrongArity("info")),
    };

    let body = match section.as_deref() {
        None | Some("replication") => replication_section(replication).await,
        Some(_) => String::new(),
    };

    Ok(HandlerOutcome::reply(RespValue::BulkString(body).encode()))
}

async fn replication_section(replication: &ReplicationManager) -> String {
    format!(
        "# Replication\r\nrole:{}\r\nconnected_slaves:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
        replication.role_name(),
        replication.replica_count().await,
        replication.repl_id(),
        replication.master_offset(),
    )
}
