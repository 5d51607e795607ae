use crate::commands::{CommandError, HandlerOutcome};
use crate::pubsub::PubSubHub;
use crate::resp::RespValue;

/// PUBLISH channel message: fans the message out to every subscriber and
/// replies with the number of receivers.
pub async fn publish(hub: &PubSubHub, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [channel, message] = arguments else {
        return Err(CommandError::WrongArity("publish"));
    };

    let receivers = hub.publish(channel, message).await;

    Ok(HandlerOutcome::reply(
        RespValue::Integer(receivers as i64).encode(),
    ))
}
