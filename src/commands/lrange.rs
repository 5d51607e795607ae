use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

pub fn lrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, left, right] = arguments else {
        return Err(CommandError::WrongArity("lrange"));
    };

    let left = left
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let right = right
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let items = store
        .get_list(key)
        .map_or_else(Vec::new, |list| list.range(left, right));

    Ok(HandlerOutcome::reply(RespValue::encode_array_from_strings(
        items,
    )))
}
