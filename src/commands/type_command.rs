use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

pub fn type_command(
    store: &mut KeyValueStore,
    arguments: &[String],
) -> Result<HandlerOutcome, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("type"));
    };

    let kind = match store.load(key) {
        Some(value) => value.data.kind_name(),
        None => "none",
    };

    Ok(HandlerOutcome::reply(
        RespValue::SimpleString(kind.to_string()).encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Value;

    #[test]
    fn test_type_reports_kind() {
        let mut store = KeyValueStore::new();
        store.store("text", Value::string("x"));
        let _ = store.load_or_store_list("list");
        let _ = store.load_or_store_stream("stream");
        let _ = store.load_or_store_sorted_set("zset");

        let test_cases = vec![
            ("text", "+string\r\n"),
            ("list", "+list\r\n"),
            ("stream", "+stream\r\n"),
            ("zset", "+zset\r\n"),
            ("missing", "+none\r\n"),
        ];

        for (key, expected) in test_cases {
            assert_eq!(
                type_command(&mut store, &[key.to_string()]).unwrap().reply,
                expected,
                "type of {}",
                key
            );
        }
    }
}
