use jiff::{SignedDuration, Timestamp};

use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::{DataType, KeyValueStore, Value};

/// Parsed arguments for SET: `SET key value [EX seconds | PX milliseconds]`.
pub struct SetArguments {
    key: String,
    value: String,
    expires_at: Option<Timestamp>,
}

impl SetArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let (key, value) = match arguments {
            [key, value] | [key, value, _, _] => (key.clone(), value.clone()),
            _ => return Err(CommandError::WrongArity("set")),
        };

        let expires_at = match arguments {
            [_, _, unit, amount] => {
                let amount = amount
                    .parse::<i64>()
                    .map_err(|_| CommandError::NotAnInteger)?;

                if amount <= 0 {
                    return Err(CommandError::InvalidArgument(
                        "invalid expire time in 'set' command".to_string(),
                    ));
                }

                let duration = match unit.to_uppercase().as_str() {
                    "EX" => SignedDuration::from_secs(amount),
                    "PX" => SignedDuration::from_millis(amount),
                    _ => {
                        return Err(CommandError::InvalidArgument(format!(
                            "unknown SET option {}",
                            unit
                        )));
                    }
                };

                Some(Timestamp::now() + duration)
            }
            _ => None,
        };

        Ok(Self {
            key,
            value,
            expires_at,
        })
    }
}

pub fn set(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let parsed = SetArguments::parse(arguments)?;

    store.store(
        parsed.key,
        Value {
            data: DataType::String(parsed.value),
            expires_at: parsed.expires_at,
        },
    );

    Ok(HandlerOutcome::reply(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
