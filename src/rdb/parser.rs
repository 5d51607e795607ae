use jiff::Timestamp;

use crate::rdb::RdbError;
use crate::rdb::encoding::Reader;
use crate::store::{DataType, KeyValueStore, Value};

const OPCODE_METADATA: u8 = 0xFA;
const OPCODE_RESIZE_DB: u8 = 0xFB;
const OPCODE_EXPIRY_MS: u8 = 0xFC;
const OPCODE_EXPIRY_SECS: u8 = 0xFD;
const OPCODE_SELECT_DB: u8 = 0xFE;
const OPCODE_EOF: u8 = 0xFF;
const VALUE_TYPE_STRING: u8 = 0x00;

/// One key/value pair lifted from the snapshot, expiry included. Only
/// string values are persisted by this server, so only strings load.
#[derive(Debug, PartialEq)]
pub struct RdbEntry {
    pub key: String,
    pub value: String,
    pub expires_at: Option<Timestamp>,
}

/// Walks the snapshot: `REDIS` magic plus 4-digit version, then sections
/// keyed by opcode until EOF. An expiry opcode applies to exactly the key
/// that follows it. The trailing CRC64 checksum is skipped, not verified.
pub fn parse_rdb(data: &[u8]) -> Result<Vec<RdbEntry>, RdbError> {
    let mut reader = Reader::new(data);

    let magic = reader.take(5).map_err(|_| RdbError::InvalidHeader)?;
    if magic != b"REDIS" {
        return Err(RdbError::InvalidHeader);
    }

    let version = reader.take(4).map_err(|_| RdbError::InvalidHeader)?;
    if !version.iter().all(u8::is_ascii_digit) {
        return Err(RdbError::InvalidHeader);
    }

    let mut entries = Vec::new();
    let mut pending_expiry: Option<Timestamp> = None;

    loop {
        match reader.read_byte()? {
            OPCODE_METADATA => {
                reader.read_string()?;
                reader.read_string()?;
            }
            OPCODE_SELECT_DB => {
                reader.read_length()?;
            }
            OPCODE_RESIZE_DB => {
                reader.read_length()?;
                reader.read_length()?;
            }
            OPCODE_EXPIRY_MS => {
                let ms = reader.read_u64_le()?;
                pending_expiry = Some(timestamp_from_ms(ms as i64)?);
            }
            OPCODE_EXPIRY_SECS => {
                let secs = reader.read_u32_le()?;
                pending_expiry = Some(timestamp_from_ms(secs as i64 * 1000)?);
            }
            OPCODE_EOF => {
                reader.skip(8)?;
                return Ok(entries);
            }
            VALUE_TYPE_STRING => {
                let key = reader.read_string()?;
                let value = reader.read_string()?;

                entries.push(RdbEntry {
                    key,
                    value,
                    expires_at: pending_expiry.take(),
                });
            }
            _ => return Err(RdbError::UnsupportedType),
        }
    }
}

/// Hydrates the keyspace from snapshot bytes. Entries land with their
/// absolute expiry; already-dead keys simply expire on first access.
pub fn load_into_store(data: &[u8], store: &mut KeyValueStore) -> Result<usize, RdbError> {
    let entries = parse_rdb(data)?;
    let loaded = entries.len();

    for entry in entries {
        store.store(
            entry.key,
            Value {
                data: DataType::String(entry.value),
                expires_at: entry.expires_at,
            },
        );
    }

    Ok(loaded)
}

fn timestamp_from_ms(ms: i64) -> Result<Timestamp, RdbError> {
    Timestamp::from_millisecond(ms)
        .map_err(|_| RdbError::InvalidData(format!("expiry out of range: {}", ms)))
}
