use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// Parsed arguments for BLPOP: one or more keys followed by a timeout in
/// seconds (fractional allowed, 0 = wait forever).
pub struct BlpopArguments {
    keys: Vec<String>,
    timeout_ms: u64,
}

impl BlpopArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let [keys @ .., timeout] = arguments else {
            return Err(CommandError::WrongArity("blpop"));
        };

        if keys.is_empty() {
            return Err(CommandError::WrongArity("blpop"));
        }

        let timeout_secs = timeout
            .parse::<f64>()
            .map_err(|_| CommandError::InvalidArgument("timeout is not a float or out of range".to_string()))?;

        if timeout_secs < 0.0 || !timeout_secs.is_finite() {
            return Err(CommandError::InvalidArgument(
                "timeout is negative".to_string(),
            ));
        }

        Ok(Self {
            keys: keys.to_vec(),
            timeout_ms: (timeout_secs * 1000.0) as u64,
        })
    }
}

/// First pass and every wake-up re-execution run the same code: try each key
/// in order; on a hit reply `[key, value]`, otherwise ask the dispatch loop
/// to park the command on all of its keys.
pub fn blpop(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let parsed = BlpopArguments::parse(arguments)?;

    for key in &parsed.keys {
        let Some(list) = store.get_list(key) else {
            continue;
        };

        if let Some(item) = list.try_pop_front() {
            return Ok(HandlerOutcome::reply(
                RespValue::encode_array_from_strings(vec![key.clone(), item]),
            ));
        }
    }

    Ok(HandlerOutcome::block(parsed.timeout_ms, parsed.keys))
}
