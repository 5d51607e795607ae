use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// Shared argument shape for RPUSH and LPUSH: a key plus one or more values.
pub struct PushArguments {
    key: String,
    values: Vec<String>,
}

impl PushArguments {
    pub fn parse(arguments: &[String], command: &'static str) -> Result<Self, CommandError> {
        let [key, values @ ..] = arguments else {
            return Err(CommandError::WrongArity(command));
        };

        if values.is_empty() {
            return Err(CommandError::WrongArity(command));
        }

        Ok(Self {
            key: key.clone(),
            values: values.to_vec(),
        })
    }
}

pub fn rpush(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let parsed = PushArguments::parse(arguments, "rpush")?;

    let Some(list) = store.load_or_store_list(&parsed.key) else {
        return Err(CommandError::WrongType);
    };

    let length = list.push_back(parsed.values);

    Ok(HandlerOutcome::reply_touching(
        RespValue::Integer(length as i64).encode(),
        vec![parsed.key],
    ))
}

/// LPUSH pushes values one at a time in the order given, so the last
/// argument ends up at the head.
pub fn lpush(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let parsed = PushArguments::parse(arguments, "lpush")?;

    let Some(list) = store.load_or_store_list(&parsed.key) else {
        return Err(CommandError::WrongType);
    };

    let length = list.push_front(parsed.values);

    Ok(HandlerOutcome::reply_touching(
        RespValue::Integer(length as i64).encode(),
        vec![parsed.key],
    ))
}
