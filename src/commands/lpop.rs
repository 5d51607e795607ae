use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// LPOP key [count]: without a count, one element (or null bulk); with a
/// count, an array of up to that many elements (or null array when the list
/// is absent or empty).
pub fn lpop(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let (key, count) = match arguments {
        [key] => (key, None),
        [key, count] => {
            let count = count
                .parse::<usize>()
                .map_err(|_| CommandError::NotAnInteger)?;
            (key, Some(count))
        }
        _ => return Err(CommandError::WrongArity("lpop")),
    };

    let Some(list) = store.get_list(key) else {
        let reply = match count {
            None => RespValue::NullBulkString,
            Some(_) => RespValue::NullArray,
        };
        return Ok(HandlerOutcome::reply(reply.encode()));
    };

    let reply = match count {
        None => match list.try_pop_front() {
            Some(item) => RespValue::BulkString(item),
            None => RespValue::NullBulkString,
        },
        Some(count) => {
            let items = list.try_pop_front_n(count);
            if items.is_empty() {
                RespValue::NullArray
            } else {
                RespValue::command_array(items)
            }
        }
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}
