use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;

pub fn ping(arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let reply = match arguments {
        [] => RespValue::SimpleString("PONG".to_string()),
        [message] => RespValue::BulkString(message.clone()),
        _ => return Err(CommandError::WrongArity("ping")),
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        assert_eq!(ping(&[]).unwrap().reply, "+PONG\r\n");
        assert_eq!(
            ping(&["hello".to_string()]).unwrap().reply,
            "$5\r\nhello\r\n"
        );
        assert_eq!(
            ping(&["a".to_string(), "b".to_string()]),
            Err(CommandError::WrongArity("ping"))
        );
    }
}
