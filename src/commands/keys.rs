use globset::Glob;

use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

pub fn keys(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [pattern] = arguments else {
        return Err(CommandError::WrongArity("keys"));
    };

    let matcher = Glob::new(pattern)
        .map_err(|_| CommandError::InvalidArgument(format!("invalid pattern '{}'", pattern)))?
        .compile_matcher();

    let mut matching: Vec<String> = store
        .keys()
        .into_iter()
        .filter(|key| matcher.is_match(key))
        .collect();
    matching.sort();

    Ok(HandlerOutcome::reply(
        RespValue::encode_array_from_strings(matching),
    ))
}
