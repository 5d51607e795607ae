//! Geohash scoring for the GEO commands: coordinates are normalized into
//! 26-bit cells and bit-interleaved into a single 52-bit score that sorts
//! geographically close points near each other in the sorted set.

pub const LAT_MIN: f64 = -85.05112878;
pub const LAT_MAX: f64 = 85.05112878;
pub const LON_MIN: f64 = -180.0;
pub const LON_MAX: f64 = 180.0;

const CELL_BITS: u32 = 26;
const EARTH_RADIUS_METERS: f64 = 6_372_797.560856;

pub fn coordinates_in_bounds(longitude: f64, latitude: f64) -> bool {
    (LON_MIN..=LON_MAX).contains(&longitude) && (LAT_MIN..=LAT_MAX).contains(&latitude)
}

/// Encodes a coordinate pair into the 52-bit interleaved score. Latitude
/// occupies the even bits and longitude the odd bits.
pub fn encode_coordinates(longitude: f64, latitude: f64) -> u64 {
    let lat_cell = normalize(latitude, LAT_MIN, LAT_MAX);
    let lon_cell = normalize(longitude, LON_MIN, LON_MAX);

    spread(lat_cell) | (spread(lon_cell) << 1)
}

/// Decodes a score back to the center of its cell, returning
/// `(longitude, latitude)`.
pub fn decode_coordinates(score: u64) -> (f64, f64) {
    let lat_cell = squash(score);
    let lon_cell = squash(score >> 1);

    let latitude = denormalize(lat_cell, LAT_MIN, LAT_MAX);
    let longitude = denormalize(lon_cell, LON_MIN, LON_MAX);

    (longitude, latitude)
}

/// Great-circle distance in meters between two coordinate pairs.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}

fn normalize(value: f64, min: f64, max: f64) -> u64 {
    let fraction = (value - min) / (max - min);
    let cell = (fraction * (1u64 << CELL_BITS) as f64) as u64;

    // A value exactly at the maximum lands one past the last cell.
    cell.min((1u64 << CELL_BITS) - 1)
}

fn denormalize(cell: u64, min: f64, max: f64) -> f64 {
    let fraction = (cell as f64 + 0.5) / (1u64 << CELL_BITS) as f64;
    min + fraction * (max - min)
}

/// Spreads the low 26 bits of `value` out so a zero bit sits between each.
fn spread(value: u64) -> u64 {
    let mut value = value & 0xFFFF_FFFF;
    value = (value | (value << 16)) & 0x0000_FFFF_0000_FFFF;
    value = (value | (value << 8)) & 0x00FF_00FF_00FF_00FF;
    value = (value | (value << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    value = (value | (value << 2)) & 0x3333_3333_3333_3333;
    value = (value | (value << 1)) & 0x5555_5555_5555_5555;
    value
}

/// Inverse of `spread`: collects every other bit back into a compact value.
fn squash(value: u64) -> u64 {
    let mut value = value & 0x5555_5555_5555_5555;
    value = (value | (value >> 1)) & 0x3333_3333_3333_3333;
    value = (value | (value >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    value = (value | (value >> 4)) & 0x00FF_00FF_00FF_00FF;
    value = (value | (value >> 8)) & 0x0000_FFFF_0000_FFFF;
    value = (value | (value >> 16)) & 0x0000_0000_FFFF_FFFF;
    value
}
