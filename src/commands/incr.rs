use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, KeyValueStore, Value};

/// INCR: atomic read-modify-write through the store's update hook. A missing
/// key counts from zero; the TTL of an existing key is preserved.
pub fn incr(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("incr"));
    };

    let mut result: Result<i64, CommandError> = Ok(1);

    store.update(key, |current| match current {
        None => Value::string("1"),
        Some(value) => {
            let DataType::String(ref content) = value.data else {
                result = Err(CommandError::WrongType);
                return value.clone();
            };

            match content.parse::<i64>() {
                Ok(count) => match count.checked_add(1) {
                    Some(next) => {
                        result = Ok(next);
                        Value {
                            data: DataType::String(next.to_string()),
                            expires_at: value.expires_at,
                        }
                    }
                    None => {
                        result = Err(CommandError::NotAnInteger);
                        value.clone()
                    }
                },
                Err(_) => {
                    result = Err(CommandError::NotAnInteger);
                    value.clone()
                }
            }
        }
    });

    let count = result?;

    Ok(HandlerOutcome::reply(RespValue::Integer(count).encode()))
}
