use std::fmt;

use thiserror::Error;

/// Errors surfaced while parsing or generating stream entry ids. The XADD
/// wordings match what Redis reports verbatim.
#[derive(Error, Debug, PartialEq)]
pub enum StreamIdError {
    #[error("Invalid stream ID specified as stream command argument")]
    InvalidFormat,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    NotGreaterThanTop,
    #[error("The ID specified in XADD must be greater than 0-0")]
    MustBeGreaterThan00,
}

/// A stream entry id: a millisecond timestamp plus a sequence number.
/// Derived ordering compares `ms` first, then `seq`, which is exactly the
/// id ordering streams require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// 16-byte big-endian encoding; lexicographic byte order equals numeric
    /// order on `(ms, seq)`, which is what the stream index relies on.
    pub fn encode_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.ms.to_be_bytes());
        bytes[8..].copy_from_slice(&self.seq.to_be_bytes());
        bytes
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, StreamIdError> {
        if bytes.len() != 16 {
            return Err(StreamIdError::InvalidFormat);
        }

        let ms = u64::from_be_bytes(bytes[..8].try_into().unwrap());
        let seq = u64::from_be_bytes(bytes[8..].try_into().unwrap());

        Ok(Self { ms, seq })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// An append-id pattern as given to XADD.
#[derive(Debug, PartialEq)]
enum RequestedId {
    /// `*`: both parts are server-generated from the wall clock.
    Wildcard,
    /// `ms-*`: the sequence part is server-generated.
    Partial(u64),
    /// `ms-seq`: taken literally.
    Exact(StreamId),
}

fn parse_requested_id(requested: &str) -> Result<RequestedId, StreamIdError> {
    let requested = requested.trim();

    if requested == "*" {
        return Ok(RequestedId::Wildcard);
    }

    let Some((ms_part, seq_part)) = requested.split_once('-') else {
        return Err(StreamIdError::InvalidFormat);
    };

    let ms = ms_part
        .parse::<u64>()
        .map_err(|_| StreamIdError::InvalidFormat)?;

    if seq_part == "*" {
        return Ok(RequestedId::Partial(ms));
    }

    let seq = seq_part
        .parse::<u64>()
        .map_err(|_| StreamIdError::InvalidFormat)?;

    Ok(RequestedId::Exact(StreamId::new(ms, seq)))
}

/// Resolves an XADD id pattern against the current top id.
///
/// `0-0` is always rejected; the smallest id an empty stream can start with
/// is `0-1`. When the wall clock runs behind the top id, `*` falls back to
/// `(top.ms, top.seq + 1)` so ids keep strictly increasing.
pub fn generate_next_id(
    top: Option<StreamId>,
    requested: &str,
) -> Result<StreamId, StreamIdError> {
    generate_next_id_at(top, requested, now_ms())
}

fn generate_next_id_at(
    top: Option<StreamId>,
    requested: &str,
    now_ms: u64,
) -> Result<StreamId, StreamIdError> {
    let smallest = StreamId::new(0, 1);

    match parse_requested_id(requested)? {
        RequestedId::Wildcard => match top {
            Some(top) if now_ms <= top.ms => Ok(StreamId::new(top.ms, top.seq + 1)),
            _ => Ok(StreamId::new(now_ms, 0)),
        },
        RequestedId::Partial(ms) => match top {
            None => {
                if ms == 0 {
                    Ok(smallest)
                } else {
                    Ok(StreamId::new(ms, 0))
                }
            }
            Some(top) => {
                if ms < top.ms {
                    Err(StreamIdError::NotGreaterThanTop)
                } else if ms == top.ms {
                    Ok(StreamId::new(ms, top.seq + 1))
                } else {
                    Ok(StreamId::new(ms, 0))
                }
            }
        },
        RequestedId::Exact(id) => {
            if id == StreamId::ZERO {
                return Err(StreamIdError::MustBeGreaterThan00);
            }

            match top {
                None => {
                    if id < smallest {
                        Err(StreamIdError::NotGreaterThanTop)
                    } else {
                        Ok(id)
                    }
                }
                Some(top) => {
                    if id <= top {
                        Err(StreamIdError::NotGreaterThanTop)
                    } else {
                        Ok(id)
                    }
                }
            }
        }
    }
}

/// Parses the start bound of a read range. `-` is the minimum id, `$` is the
/// current top (or the zero id for an empty stream), and a bare `ms` expands
/// to `ms-0`.
pub fn parse_range_start(
    requested: &str,
    top: Option<StreamId>,
) -> Result<StreamId, StreamIdError> {
    let requested = requested.trim();

    match requested {
        "" => Err(StreamIdError::InvalidFormat),
        "-" => Ok(StreamId::ZERO),
        "$" => Ok(top.unwrap_or(StreamId::ZERO)),
        _ => parse_bound(requested, 0),
    }
}

/// Parses the end bound of a read range. `+` is the maximum id and a bare
/// `ms` expands to `ms-<u64::MAX>`.
pub fn parse_range_end(requested: &str) -> Result<StreamId, StreamIdError> {
    let requested = requested.trim();

    match requested {
        "" => Err(StreamIdError::InvalidFormat),
        "+" => Ok(StreamId::MAX),
        _ => parse_bound(requested, u64::MAX),
    }
}

fn parse_bound(requested: &str, default_seq: u64) -> Result<StreamId, StreamIdError> {
    match requested.split_once('-') {
        None => {
            let ms = requested
                .parse::<u64>()
                .map_err(|_| StreamIdError::InvalidFormat)?;

            Ok(StreamId::new(ms, default_seq))
        }
        Some((ms_part, seq_part)) => {
            let ms = ms_part
                .parse::<u64>()
                .map_err(|_| StreamIdError::InvalidFormat)?;
            let seq = seq_part
                .parse::<u64>()
                .map_err(|_| StreamIdError::InvalidFormat)?;

            Ok(StreamId::new(ms, seq))
        }
    }
}

fn now_ms() -> u64 {
    jiff::Timestamp::now().as_millisecond().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requested_id() {
        let test_cases = vec![
            ("*", Ok(RequestedId::Wildcard), "full wildcard"),
            ("5-*", Ok(RequestedId::Partial(5)), "partial wildcard"),
            (
                "1526919030484-3",
                Ok(RequestedId::Exact(StreamId::new(1526919030484, 3))),
                "exact id",
            ),
            ("0-0", Ok(RequestedId::Exact(StreamId::ZERO)), "zero id"),
            ("abc", Err(StreamIdError::InvalidFormat), "not a number"),
            ("1-2-3", Err(StreamIdError::InvalidFormat), "too many parts"),
            ("1-x", Err(StreamIdError::InvalidFormat), "bad sequence"),
            ("-1-0", Err(StreamIdError::InvalidFormat), "negative ms"),
        ];

        for (input, expected, description) in test_cases {
            assert_eq!(
                parse_requested_id(input),
                expected,
                "parsing {}",
                description
            );
        }
    }

    #[test]
    fn test_generate_next_id() {
        let top = Some(StreamId::new(5, 5));
        let test_cases = vec![
            (None, "0-0", Err(StreamIdError::MustBeGreaterThan00), "0-0 rejected on empty stream"),
            (top, "0-0", Err(StreamIdError::MustBeGreaterThan00), "0-0 rejected with top"),
            (None, "0-1", Ok(StreamId::new(0, 1)), "smallest legal first id"),
            (None, "7-3", Ok(StreamId::new(7, 3)), "explicit id on empty stream"),
            (top, "5-5", Err(StreamIdError::NotGreaterThanTop), "equal to top"),
            (top, "5-4", Err(StreamIdError::NotGreaterThanTop), "smaller seq"),
            (top, "4-9", Err(StreamIdError::NotGreaterThanTop), "smaller ms"),
            (top, "5-6", Ok(StreamId::new(5, 6)), "next seq"),
            (top, "6-0", Ok(StreamId::new(6, 0)), "next ms"),
            (None, "0-*", Ok(StreamId::new(0, 1)), "partial on empty stream with ms 0"),
            (None, "3-*", Ok(StreamId::new(3, 0)), "partial on empty stream"),
            (top, "5-*", Ok(StreamId::new(5, 6)), "partial matching top ms"),
            (top, "9-*", Ok(StreamId::new(9, 0)), "partial beyond top ms"),
            (top, "4-*", Err(StreamIdError::NotGreaterThanTop), "partial below top ms"),
        ];

        for (top, requested, expected, description) in test_cases {
            assert_eq!(
                generate_next_id_at(top, requested, 100),
                expected,
                "generating {}",
                description
            );
        }
    }

    #[test]
    fn test_generate_wildcard_uses_clock() {
        // Fresh stream: wall-clock ms with sequence 0.
        assert_eq!(
            generate_next_id_at(None, "*", 1000),
            Ok(StreamId::new(1000, 0))
        );

        // Clock ahead of top: wall-clock wins.
        assert_eq!(
            generate_next_id_at(Some(StreamId::new(500, 2)), "*", 1000),
            Ok(StreamId::new(1000, 0))
        );

        // Clock equal to top ms: bump the sequence.
        assert_eq!(
            generate_next_id_at(Some(StreamId::new(1000, 2)), "*", 1000),
            Ok(StreamId::new(1000, 3))
        );

        // Clock behind the top: stay on the top ms and bump the sequence.
        assert_eq!(
            generate_next_id_at(Some(StreamId::new(2000, 7)), "*", 1000),
            Ok(StreamId::new(2000, 8))
        );
    }

    #[test]
    fn test_parse_range_bounds() {
        let test_cases = vec![
            ("-", None, Ok(StreamId::ZERO), "minimum"),
            ("$", Some(StreamId::new(9, 9)), Ok(StreamId::new(9, 9)), "top"),
            ("$", None, Ok(StreamId::ZERO), "top of empty stream"),
            ("12", None, Ok(StreamId::new(12, 0)), "bare ms"),
            ("12-7", None, Ok(StreamId::new(12, 7)), "full id"),
            ("x", None, Err(StreamIdError::InvalidFormat), "garbage"),
        ];

        for (input, top, expected, description) in test_cases {
            assert_eq!(
                parse_range_start(input, top),
                expected,
                "start bound {}",
                description
            );
        }

        assert_eq!(parse_range_end("+"), Ok(StreamId::MAX));
        assert_eq!(parse_range_end("12"), Ok(StreamId::new(12, u64::MAX)));
        assert_eq!(parse_range_end("12-7"), Ok(StreamId::new(12, 7)));
        assert_eq!(parse_range_end("nope"), Err(StreamIdError::InvalidFormat));
    }

    #[test]
    fn test_byte_encoding_round_trip_and_order() {
        let ids = vec![
            StreamId::ZERO,
            StreamId::new(0, 1),
            StreamId::new(1, 0),
            StreamId::new(1, u64::MAX),
            StreamId::new(2, 0),
            StreamId::MAX,
        ];

        for id in &ids {
            let decoded = StreamId::decode_bytes(&id.encode_bytes()).unwrap();
            assert_eq!(decoded, *id);
        }

        // Byte-wise comparison must agree with id comparison.
        for a in &ids {
            for b in &ids {
                assert_eq!(
                    a.encode_bytes() < b.encode_bytes(),
                    a < b,
                    "byte order mismatch for {} vs {}",
                    a,
                    b
                );
            }
        }

        assert!(StreamId::decode_bytes(&[0u8; 8]).is_err());
    }
}
