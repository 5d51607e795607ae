use crate::commands::stream_utils::streams_to_resp;
use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;
use crate::types::StreamId;
use crate::types::stream_id::parse_range_start;

/// Parsed arguments for XREAD: `XREAD [BLOCK ms] STREAMS key… id…`.
pub struct XreadArguments {
    block_ms: Option<u64>,
    keys: Vec<String>,
    after_ids: Vec<String>,
}

impl XreadArguments {
    pub fn parse(arguments: &[String]) -> Result<Self, CommandError> {
        let mut remaining = arguments;

        let block_ms = if remaining
            .first()
            .is_some_and(|first| first.to_uppercase() == "BLOCK")
        {
            let Some(duration) = remaining.get(1) else {
                return Err(CommandError::WrongArity("xread"));
            };

            let duration = duration
                .parse::<u64>()
                .map_err(|_| CommandError::NotAnInteger)?;

            remaining = &remaining[2..];
            Some(duration)
        } else {
            None
        };

        let [keyword, pairs @ ..] = remaining else {
            return Err(CommandError::WrongArity("xread"));
        };

        if keyword.to_uppercase() != "STREAMS" {
            return Err(CommandError::InvalidArgument(
                "syntax error in XREAD, expected STREAMS".to_string(),
            ));
        }

        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Err(CommandError::InvalidArgument(
                "Unbalanced XREAD list of streams: for each stream key an ID or '$' must be specified."
                    .to_string(),
            ));
        }

        let (keys, after_ids) = pairs.split_at(pairs.len() / 2);

        Ok(Self {
            block_ms,
            keys: keys.to_vec(),
            after_ids: after_ids.to_vec(),
        })
    }
}

/// The non-blocking collect runs on every pass. When nothing is available
/// and BLOCK was given, the arguments are rewritten in place to the BLOCK
/// form with `$` pinned to each stream's current top, so re-execution after
/// a wake-up only sees entries newer than the first pass.
pub fn xread(
    store: &mut KeyValueStore,
    arguments: &mut Vec<String>,
) -> Result<HandlerOutcome, CommandError> {
    let parsed = XreadArguments::parse(arguments)?;

    let mut resolved_after: Vec<StreamId> = Vec::with_capacity(parsed.keys.len());
    for (key, after_id) in parsed.keys.iter().zip(&parsed.after_ids) {
        let Some(stream) = store.load_or_store_stream(key) else {
            return Err(CommandError::WrongType);
        };

        resolved_after.push(parse_range_start(after_id, stream.top_id())?);
    }

    let mut found: Vec<(String, Vec<crate::types::Entry>)> = Vec::new();
    for (key, after) in parsed.keys.iter().zip(&resolved_after) {
        let entries = store
            .get_stream(key)
            .map_or_else(Vec::new, |stream| stream.entries_after(*after));

        if !entries.is_empty() {
            found.push((key.clone(), entries));
        }
    }

    if !found.is_empty() {
        return Ok(HandlerOutcome::reply(streams_to_resp(&found).encode()));
    }

    let Some(block_ms) = parsed.block_ms else {
        return Ok(HandlerOutcome::reply(RespValue::NullArray.encode()));
    };

    let mut rewritten = vec![
        "BLOCK".to_string(),
        block_ms.to_string(),
        "STREAMS".to_string(),
    ];
    rewritten.extend(parsed.keys.iter().cloned());
    rewritten.extend(resolved_after.iter().map(|id| id.to_string()));
    *arguments = rewritten;

    Ok(HandlerOutcome::block(block_ms, parsed.keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::xadd::xadd;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_xread_returns_entries_after_id() {
        let mut store = KeyValueStore::new();
        xadd(&mut store, &args(&["s", "1-1", "a", "1"])).unwrap();
        xadd(&mut store, &args(&["s", "2-0", "b", "2"])).unwrap();

        let mut arguments = args(&["STREAMS", "s", "1-1"]);
        let outcome = xread(&mut store, &mut arguments).unwrap();

        assert!(outcome.reply.contains("2-0"));
        assert!(!outcome.reply.contains("1-1\r\n*2"));
        assert_eq!(outcome.block_for_ms, None);
    }

    #[test]
    fn test_xread_multiple_streams_skips_empty_ones() {
        let mut store = KeyValueStore::new();
        xadd(&mut store, &args(&["s1", "1-1", "a", "1"])).unwrap();
        xadd(&mut store, &args(&["s2", "1-1", "b", "2"])).unwrap();

        let mut arguments = args(&["STREAMS", "s1", "s2", "0-0", "1-1"]);
        let outcome = xread(&mut store, &mut arguments).unwrap();

        // Only s1 has entries after its id.
        assert!(outcome.reply.starts_with("*1\r\n"));
        assert!(outcome.reply.contains("s1"));
    }

    #[test]
    fn test_xread_without_block_returns_null_array() {
        let mut store = KeyValueStore::new();
        xadd(&mut store, &args(&["s", "1-1", "a", "1"])).unwrap();

        let mut arguments = args(&["STREAMS", "s", "5-0"]);
        let outcome = xread(&mut store, &mut arguments).unwrap();
        assert_eq!(outcome.reply, "*-1\r\n");
    }

    #[test]
    fn test_xread_block_rewrites_arguments_and_pins_dollar() {
        let mut store = KeyValueStore::new();
        xadd(&mut store, &args(&["s", "3-3", "a", "1"])).unwrap();

        let mut arguments = args(&["BLOCK", "500", "STREAMS", "s", "$"]);
        let outcome = xread(&mut store, &mut arguments).unwrap();

        assert_eq!(outcome.block_for_ms, Some(500));
        assert_eq!(outcome.touched_keys, vec!["s".to_string()]);
        assert_eq!(arguments, args(&["BLOCK", "500", "STREAMS", "s", "3-3"]));

        // After an append, re-execution with the rewritten args finds it.
        xadd(&mut store, &args(&["s", "4-0", "b", "2"])).unwrap();
        let outcome = xread(&mut store, &mut arguments).unwrap();
        assert!(outcome.reply.contains("4-0"));
        assert_eq!(outcome.block_for_ms, None);
    }

    #[test]
    fn test_xread_dollar_on_empty_stream_blocks() {
        let mut store = KeyValueStore::new();

        let mut arguments = args(&["BLOCK", "0", "STREAMS", "fresh", "$"]);
        let outcome = xread(&mut store, &mut arguments).unwrap();

        assert_eq!(outcome.block_for_ms, Some(0));
        assert_eq!(arguments, args(&["BLOCK", "0", "STREAMS", "fresh", "0-0"]));
    }

    #[test]
    fn test_xread_argument_errors() {
        let mut store = KeyValueStore::new();

        let cases = vec![
            args(&["STREAMS"]),
            args(&["STREAMS", "s"]),
            args(&["BLOCK", "STREAMS", "s", "$"]),
            args(&["NOSTREAMS", "s", "$"]),
        ];

        for mut arguments in cases {
            assert!(
                xread(&mut store, &mut arguments).is_err(),
                "expected error for {:?}",
                arguments
            );
        }
    }
}
