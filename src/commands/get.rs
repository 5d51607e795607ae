use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, KeyValueStore};

pub fn get(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("get"));
    };

    let reply = match store.load(key) {
        Some(value) => match value.data {
            DataType::String(ref content) => RespValue::BulkString(content.clone()),
            _ => return Err(CommandError::WrongType),
        },
        None => RespValue::NullBulkString,
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}
