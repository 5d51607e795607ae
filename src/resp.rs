use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type")]
    UnknownRespType,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
    #[error("empty command")]
    EmptyCommand,
}

impl RespError {
    pub fn to_resp(&self) -> String {
        RespValue::Error("ERR invalid command format".to_string()).encode()
    }
}

/// A single RESP2 value. Requests arrive as arrays of bulk strings; replies
/// use the full set of variants.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(String),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Tries to parse one complete top-level frame from the start of `buffer`.
    ///
    /// Returns `Ok(Some((value, consumed)))` when a full frame is available,
    /// `Ok(None)` when the buffer holds only a prefix of a frame (nothing is
    /// consumed so the caller can accumulate more bytes), and `Err` when the
    /// bytes cannot be a RESP frame at all.
    pub fn parse_frame(buffer: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        decode(buffer, 0)
    }

    /// Parses every complete frame at the start of `buffer` and returns the
    /// values together with the total number of consumed bytes. Trailing
    /// partial data is left untouched.
    pub fn parse_all(buffer: &[u8]) -> Result<(Vec<RespValue>, usize), RespError> {
        let mut values = Vec::new();
        let mut consumed = 0;

        while let Some((value, frame_len)) = Self::parse_frame(&buffer[consumed..])? {
            values.push(value);
            consumed += frame_len;
        }

        Ok((values, consumed))
    }

    pub fn encode(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s),
            RespValue::Error(msg) => format!("-{}\r\n", msg),
            RespValue::Integer(n) => format!(":{}\r\n", n),
            RespValue::BulkString(s) => format!("${}\r\n{}\r\n", s.len(), s),
            RespValue::NullBulkString => "$-1\r\n".to_string(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len());
                for element in elements {
                    encoded.push_str(&element.encode());
                }
                encoded
            }
            RespValue::NullArray => "*-1\r\n".to_string(),
        }
    }

    /// Builds the usual request/propagation shape: an array of bulk strings.
    pub fn command_array<I, S>(parts: I) -> RespValue
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RespValue::Array(
            parts
                .into_iter()
                .map(|part| RespValue::BulkString(part.into()))
                .collect(),
        )
    }

    pub fn encode_array_from_strings<I, S>(parts: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::command_array(parts).encode()
    }

    /// Extracts `(command_name, arguments)` from a request frame by
    /// flattening the leaf bulk strings of the top-level array in order.
    /// The leading element is upper-cased and trimmed.
    pub fn flatten_command(&self) -> Result<(String, Vec<String>), RespError> {
        let RespValue::Array(_) = self else {
            return Err(RespError::InvalidArray);
        };

        let mut parts = Vec::new();
        collect_leaves(self, &mut parts);

        let Some((name, arguments)) = parts.split_first() else {
            return Err(RespError::EmptyCommand);
        };

        Ok((name.trim().to_uppercase(), arguments.to_vec()))
    }
}

/// Encodes the RDB transfer payload used during FULLRESYNC: a bulk-string
/// header followed by the raw bytes with no trailing CRLF.
pub fn encode_rdb_payload(payload: &[u8]) -> Vec<u8> {
    let mut encoded = format!("${}\r\n", payload.len()).into_bytes();
    encoded.extend_from_slice(payload);
    encoded
}

fn collect_leaves(value: &RespValue, parts: &mut Vec<String>) {
    match value {
        RespValue::Array(elements) => {
            for element in elements {
                collect_leaves(element, parts);
            }
        }
        RespValue::BulkString(s) | RespValue::SimpleString(s) => parts.push(s.clone()),
        RespValue::Integer(n) => parts.push(n.to_string()),
        _ => {}
    }
}

/// Finds the next CRLF at or after `cursor` and returns the line content and
/// the cursor just past the terminator. `None` means the line is incomplete.
fn read_line(buffer: &[u8], cursor: usize) -> Result<Option<(&str, usize)>, RespError> {
    let remaining = &buffer[cursor..];
    let Some(pos) = remaining.windows(2).position(|window| window == b"\r\n") else {
        return Ok(None);
    };

    let line = str::from_utf8(&remaining[..pos]).map_err(|_| RespError::InvalidUtf8)?;

    Ok(Some((line, cursor + pos + 2)))
}

fn decode(buffer: &[u8], cursor: usize) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some((line, after_line)) = read_line(buffer, cursor)? else {
        return Ok(None);
    };

    if line.is_empty() {
        return Err(RespError::UnknownRespType);
    }

    // The type byte is ASCII for every frame we accept, so slicing off one
    // byte below never splits a character.
    match line.as_bytes()[0] {
        b'+' => Ok(Some((
            RespValue::SimpleString(line[1..].to_string()),
            after_line,
        ))),
        b'-' => Ok(Some((RespValue::Error(line[1..].to_string()), after_line))),
        b':' => {
            let value = line[1..]
                .parse::<i64>()
                .map_err(|_| RespError::FailedToParseInteger)?;

            Ok(Some((RespValue::Integer(value), after_line)))
        }
        b'$' => decode_bulk_string(buffer, &line[1..], after_line),
        b'*' => decode_array(buffer, &line[1..], after_line),
        _ => Err(RespError::UnknownRespType),
    }
}

fn decode_bulk_string(
    buffer: &[u8],
    length_info: &str,
    cursor: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    if length_info == "-1" {
        return Ok(Some((RespValue::NullBulkString, cursor)));
    }

    let length = length_info
        .parse::<usize>()
        .map_err(|_| RespError::InvalidBulkString)?;

    // Content plus its CRLF must be fully buffered before anything is consumed.
    if buffer.len() < cursor + length + 2 {
        return Ok(None);
    }

    let content =
        str::from_utf8(&buffer[cursor..cursor + length]).map_err(|_| RespError::InvalidUtf8)?;

    if &buffer[cursor + length..cursor + length + 2] != b"\r\n" {
        return Err(RespError::InvalidBulkString);
    }

    Ok(Some((
        RespValue::BulkString(content.to_string()),
        cursor + length + 2,
    )))
}

fn decode_array(
    buffer: &[u8],
    length_info: &str,
    cursor: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    if length_info == "-1" {
        return Ok(Some((RespValue::NullArray, cursor)));
    }

    let length = length_info
        .parse::<usize>()
        .map_err(|_| RespError::InvalidArray)?;

    let mut elements = Vec::with_capacity(length);
    let mut element_cursor = cursor;

    while elements.len() < length {
        let Some((element, next_cursor)) = decode(buffer, element_cursor)? else {
            return Ok(None);
        };

        elements.push(element);
        element_cursor = next_cursor;
    }

    Ok(Some((RespValue::Array(elements), element_cursor)))
}
