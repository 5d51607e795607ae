use crate::commands::{CommandError, HandlerOutcome};
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// ZADD key score member [score member …]. Existing members keep their
/// score; the reply counts only newly added members.
pub fn zadd(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, pairs @ ..] = arguments else {
        return Err(CommandError::WrongArity("zadd"));
    };

    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::WrongArity("zadd"));
    }

    let mut entries = Vec::with_capacity(pairs.len() / 2);
    for chunk in pairs.chunks(2) {
        let score = parse_score(&chunk[0])?;
        entries.push((chunk[1].clone(), score));
    }

    let Some(set) = store.load_or_store_sorted_set(key) else {
        return Err(CommandError::WrongType);
    };

    let added = set.add(entries);

    Ok(HandlerOutcome::reply(
        RespValue::Integer(added as i64).encode(),
    ))
}

pub fn zrank(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, member] = arguments else {
        return Err(CommandError::WrongArity("zrank"));
    };

    let reply = match store.get_sorted_set(key).and_then(|set| set.rank(member)) {
        Some(rank) => RespValue::Integer(rank as i64),
        None => RespValue::NullBulkString,
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}

pub fn zrange(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, start, stop] = arguments else {
        return Err(CommandError::WrongArity("zrange"));
    };

    let start = start
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;
    let stop = stop
        .parse::<i64>()
        .map_err(|_| CommandError::NotAnInteger)?;

    let members = store
        .get_sorted_set(key)
        .map_or_else(Vec::new, |set| set.range_by_rank(start, stop));

    Ok(HandlerOutcome::reply(RespValue::encode_array_from_strings(
        members,
    )))
}

pub fn zcard(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key] = arguments else {
        return Err(CommandError::WrongArity("zcard"));
    };

    let cardinality = store.get_sorted_set(key).map_or(0, |set| set.card());

    Ok(HandlerOutcome::reply(
        RespValue::Integer(cardinality as i64).encode(),
    ))
}

pub fn zscore(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, member] = arguments else {
        return Err(CommandError::WrongArity("zscore"));
    };

    let reply = match store.get_sorted_set(key).and_then(|set| set.score(member)) {
        Some(score) => RespValue::BulkString(format_score(score)),
        None => RespValue::NullBulkString,
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}

pub fn zrem(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, members @ ..] = arguments else {
        return Err(CommandError::WrongArity("zrem"));
    };

    if members.is_empty() {
        return Err(CommandError::WrongArity("zrem"));
    }

    let removed = store
        .get_sorted_set(key)
        .map_or(0, |set| set.remove(members.iter().map(String::as_str)));

    Ok(HandlerOutcome::reply(
        RespValue::Integer(removed as i64).encode(),
    ))
}

fn parse_score(raw: &str) -> Result<f64, CommandError> {
    let score = raw.parse::<f64>().map_err(|_| CommandError::NotAFloat)?;

    if score.is_nan() {
        return Err(CommandError::NotAFloat);
    }

    Ok(score)
}

/// Scores with no fractional part print as integers, like Redis.
pub fn format_score(score: f64) -> String {
    if score == score.trunc() && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}
