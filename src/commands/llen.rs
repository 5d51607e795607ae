use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

pub fn llen(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("llen"));
    };

    let length = store.get_list(key).map_or(0, |list| list.len());

    Ok(HandlerOutcome::reply(
        RespValue::Integer(length as i64).encode(),
    ))
}
