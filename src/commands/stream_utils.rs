use crate::resp::RespValue;
use crate::types::Entry;

/// Renders entries the way XRANGE replies: each entry is a two-element array
/// of the id and the flattened field/value pairs.
pub fn entries_to_resp(entries: &[Entry]) -> RespValue {
    RespValue::Array(entries.iter().map(entry_to_resp).collect())
}

/// Renders the XREAD reply shape: one `[key, entries]` pair per stream, in
/// the order the streams were requested.
pub fn streams_to_resp(streams: &[(String, Vec<Entry>)]) -> RespValue {
    RespValue::Array(
        streams
            .iter()
            .map(|(key, entries)| {
                RespValue::Array(vec![
                    RespValue::BulkString(key.clone()),
                    entries_to_resp(entries),
                ])
            })
            .collect(),
    )
}

fn entry_to_resp(entry: &Entry) -> RespValue {
    let mut flattened = Vec::with_capacity(entry.fields.len() * 2);
    for (field, value) in &entry.fields {
        flattened.push(RespValue::BulkString(field.clone()));
        flattened.push(RespValue::BulkString(value.clone()));
    }

    RespValue::Array(vec![
        RespValue::BulkString(entry.id.to_string()),
        RespValue::Array(flattened),
    ])
}
