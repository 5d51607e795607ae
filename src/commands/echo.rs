use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;

pub fn echo(arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [message] = arguments else {
        return Err(CommandError::WrongArity("echo"));
    };

    Ok(HandlerOutcome::reply(
        RespValue::BulkString(message.clone()).encode(),
    ))
}
