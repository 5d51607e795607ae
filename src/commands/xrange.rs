use crate::commands::stream_utils::entries_to_resp;
use crate::commands::{CommandError, HandlerOutcome};
use crate::store::KeyValueStore;
use crate::types::stream_id::{parse_range_end, parse_range_start};

/// XRANGE key start end: a closed-interval scan. `-` and `+` name the
/// extremes; a bare millisecond expands to `ms-0` on the left and
/// `ms-<max>` on the right.
pub fn xrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, start, end] = arguments else {
        return Err(CommandError::WrongArity("xrange"));
    };

    let start = parse_range_start(start, None)?;
    let end = parse_range_end(end)?;

    let entries = store
        .get_stream(key)
        .map_or_else(Vec::new, |stream| stream.range_scan(start, end));

    Ok(HandlerOutcome::reply(entries_to_resp(&entries).encode()))
}
