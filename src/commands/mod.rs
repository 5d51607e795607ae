mod blpop;
mod command_error;
mod config_get;
mod echo;
mod geo_commands;
mod get;
mod incr;
mod info;
mod keys;
mod llen;
mod lpop;
mod lrange;
mod ping;
mod publish;
mod rpush_and_lpush;
mod set;
mod sorted_set_commands;
mod stream_utils;
mod type_command;
mod xadd;
mod xrange;
mod xread;

pub use command_error::CommandError;

use crate::config::ServerConfig;
use crate::pubsub::PubSubHub;
use crate::replication::ReplicationManager;
use crate::store::KeyValueStore;

/// What a data-command handler hands back to the dispatch loop.
///
/// A `block_for_ms` of `Some` means the command could not complete and must
/// be parked on its `touched_keys` (`Some(0)` waits forever); the reply is
/// then ignored. With `None` the reply goes to the session and the touched
/// keys are used to wake blocked waiters.
#[derive(Debug, PartialEq)]
pub struct HandlerOutcome {
    pub reply: String,
    pub touched_keys: Vec<String>,
    pub block_for_ms: Option<u64>,
}

impl HandlerOutcome {
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            touched_keys: Vec::new(),
            block_for_ms: None,
        }
    }

    pub fn reply_touching(reply: impl Into<String>, touched_keys: Vec<String>) -> Self {
        Self {
            reply: reply.into(),
            touched_keys,
            block_for_ms: None,
        }
    }

    pub fn block(timeout_ms: u64, keys: Vec<String>) -> Self {
        Self {
            reply: String::new(),
            touched_keys: keys,
            block_for_ms: Some(timeout_ms),
        }
    }
}

/// The write-command set: successful runs of these are forwarded to
/// replicas byte-exactly.
pub fn is_write_command(name: &str) -> bool {
    matches!(name, "SET" | "LPUSH" | "RPUSH" | "LPOP" | "XADD" | "INCR")
}

/// Name → handler table for every data command the dispatch loop executes.
/// Session-level commands (MULTI, SUBSCRIBE, REPLCONF, …) never reach this
/// table; the session routes them before enqueueing.
pub async fn execute_data_command(
    name: &str,
    arguments: &mut Vec<String>,
    store: &mut KeyValueStore,
    config: &ServerConfig,
    replication: &ReplicationManager,
    pubsub: &PubSubHub,
) -> Result<HandlerOutcome, CommandError> {
    match name {
        "PING" => ping::ping(arguments),
        "ECHO" => echo::echo(arguments),
        "GET" => get::get(store, arguments),
        "SET" => set::set(store, arguments),
        "INCR" => incr::incr(store, arguments),
        "TYPE" => type_command::type_command(store, arguments),
        "KEYS" => keys::keys(store, arguments),
        "CONFIG" => config_get::config_get(config, arguments),
        "INFO" => info::info(replication, arguments).await,
        "RPUSH" => rpush_and_lpush::rpush(store, arguments),
        "LPUSH" => rpush_and_lpush::lpush(store, arguments),
        "LPOP" => lpop::lpop(store, arguments),
        "LLEN" => llen::llen(store, arguments),
        "LRANGE" => lrange::lrange(store, arguments),
        "BLPOP" => blpop::blpop(store, arguments),
        "XADD" => xadd::xadd(store, arguments),
        "XRANGE" => xrange::xrange(store, arguments),
        "XREAD" => xread::xread(store, arguments),
        "ZADD" => sorted_set_commands::zadd(store, arguments),
        "ZRANK" => sorted_set_commands::zrank(store, arguments),
        "ZRANGE" => sorted_set_commands::zrange(store, arguments),
        "ZCARD" => sorted_set_commands::zcard(store, arguments),
        "ZSCORE" => sorted_set_commands::zscore(store, arguments),
        "ZREM" => sorted_set_commands::zrem(store, arguments),
        "GEOADD" => geo_commands::geoadd(store, arguments),
        "GEOPOS" => geo_commands::geopos(store, arguments),
        "GEODIST" => geo_commands::geodist(store, arguments),
        "GEOSEARCH" => geo_commands::geosearch(store, arguments),
        "PUBLISH" => publish::publish(pubsub, arguments).await,
        _ => Err(CommandError::UnknownCommand(name.to_string())),
    }
}
