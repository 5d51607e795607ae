use crate::commands::{CommandError, HandlerOutcome};
use crate::geo;
use crate::resp::RespValue;
use crate::store::KeyValueStore;

/// GEOADD key lon lat member [lon lat member …]: members land in a sorted
/// set scored by the interleaved geohash of their coordinates.
pub fn geoadd(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, triples @ ..] = arguments else {
        return Err(CommandError::WrongArity("geoadd"));
    };

    if triples.is_empty() || triples.len() % 3 != 0 {
        return Err(CommandError::WrongArity("geoadd"));
    }

    let mut entries = Vec::with_capacity(triples.len() / 3);
    for chunk in triples.chunks(3) {
        let (longitude, latitude) = parse_coordinates(&chunk[0], &chunk[1])?;
        let score = geo::encode_coordinates(longitude, latitude) as f64;
        entries.push((chunk[2].clone(), score));
    }

    let Some(set) = store.load_or_store_sorted_set(key) else {
        return Err(CommandError::WrongType);
    };

    let added = set.add(entries);

    Ok(HandlerOutcome::reply(
        RespValue::Integer(added as i64).encode(),
    ))
}

/// GEOPOS key member…: one `[lon, lat]` pair per member, a null array for
/// members (or keys) that do not exist.
pub fn geopos(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, members @ ..] = arguments else {
        return Err(CommandError::WrongArity("geopos"));
    };

    if members.is_empty() {
        return Err(CommandError::WrongArity("geopos"));
    }

    let positions: Vec<RespValue> = members
        .iter()
        .map(|member| {
            match store.get_sorted_set(key).and_then(|set| set.score(member)) {
                Some(score) => {
                    let (longitude, latitude) = geo::decode_coordinates(score as u64);
                    RespValue::Array(vec![
                        RespValue::BulkString(format_coordinate(longitude)),
                        RespValue::BulkString(format_coordinate(latitude)),
                    ])
                }
                None => RespValue::NullArray,
            }
        })
        .collect();

    Ok(HandlerOutcome::reply(RespValue::Array(positions).encode()))
}

/// GEODIST key member1 member2: haversine distance in meters, null bulk when
/// either member is missing.
pub fn geodist(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, first, second] = arguments else {
        return Err(CommandError::WrongArity("geodist"));
    };

    let scores = store.get_sorted_set(key).map(|set| {
        (set.score(first), set.score(second))
    });

    let reply = match scores {
        Some((Some(first_score), Some(second_score))) => {
            let (lon1, lat1) = geo::decode_coordinates(first_score as u64);
            let (lon2, lat2) = geo::decode_coordinates(second_score as u64);
            let distance = geo::haversine_distance(lon1, lat1, lon2, lat2);
            RespValue::BulkString(format!("{:.4}", distance))
        }
        _ => RespValue::NullBulkString,
    };

    Ok(HandlerOutcome::reply(reply.encode()))
}

/// GEOSEARCH key FROMLONLAT lon lat BYRADIUS radius unit: every member whose
/// decoded position falls inside the radius, filtered by haversine distance.
pub fn geosearch(store: &mut KeyValueStore, arguments: &[String]) -> Result<HandlerOutcome, CommandError> {
    let [key, from_keyword, lon, lat, by_keyword, radius, unit] = arguments else {
        return Err(CommandError::WrongArity("geosearch"));
    };

    if from_keyword.to_uppercase() != "FROMLONLAT" || by_keyword.to_uppercase() != "BYRADIUS" {
        return Err(CommandError::InvalidArgument(
            "syntax error in GEOSEARCH, expected FROMLONLAT and BYRADIUS".to_string(),
        ));
    }

    let (longitude, latitude) = parse_coordinates(lon, lat)?;

    let radius = radius
        .parse::<f64>()
        .map_err(|_| CommandError::NotAFloat)?;
    let radius_meters = match unit.to_lowercase().as_str() {
        "m" => radius,
        "km" => radius * 1000.0,
        _ => {
            return Err(CommandError::InvalidArgument(
                "unsupported unit provided. please use m, km".to_string(),
            ));
        }
    };

    let members = store
        .get_sorted_set(key)
        .map_or_else(Vec::new, |set| set.range_by_score(f64::MIN, f64::MAX));

    let matching: Vec<String> = members
        .into_iter()
        .filter(|(_, score)| {
            let (member_lon, member_lat) = geo::decode_coordinates(*score as u64);
            geo::haversine_distance(member_lon, member_lat, longitude, latitude) <= radius_meters
        })
        .map(|(member, _)| member)
        .collect();

    Ok(HandlerOutcome::reply(RespValue::encode_array_from_strings(
        matching,
    )))
}

fn parse_coordinates(lon: &str, lat: &str) -> Result<(f64, f64), CommandError> {
    let longitude = lon.parse::<f64>().map_err(|_| CommandError::NotAFloat)?;
    let latitude = lat.parse::<f64>().map_err(|_| CommandError::NotAFloat)?;

    if !geo::coordinates_in_bounds(longitude, latitude) {
        return Err(CommandError::InvalidCoordinates(
            lon.to_string(),
            lat.to_string(),
        ));
    }

    Ok((longitude, latitude))
}

fn format_coordinate(value: f64) -> String {
    format!("{:.17}", value)
}
