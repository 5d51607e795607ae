use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// Parsed arguments for XADD: key, id pattern, and at least one field/value
/// pair.
pub struct XaddArguments {
    key: String,
    requested_id: String,
    fields: Vec<(String, String)>,
}

impl XaddArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [key, requested_id, pairs @ ..] = arguments else {
            return Err(CommandError::WrongArity("xadd"));
        };

        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(CommandError::WrongArity("xadd"));
        }

        Ok(Self {
            key: key.clone(),
            requested_id: requested_id.clone(),
            fields: pairs
                .chunks(2)
                .map(|chunk| (chunk[0].clone(), chunk[1].clone()))
                .collect(),
        })
    }
}

pub fn xadd(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let parsed = XaddArguments::parse(arguments)?;

    let Some(stream) = store.load_or_store_stream(&parsed.key) else {
        return Err(CommandError::WrongType);
    };

    let id = stream.append(&parsed.requested_id, parsed.fields)?;

    Ok(HandlerOutcome::reply_touching(
        RespValue::BulkString(id.to_string()).encode(),
        vec![parsed.key],
    ))
}
