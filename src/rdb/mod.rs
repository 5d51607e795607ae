mod encoding;
mod parser;

use thiserror::Error;

pub use parser::{RdbEntry, load_into_store, parse_rdb};

/// RDB decode failures. The loader accepts only the subset this server
/// persists: string values, optional second/millisecond expiries, and the
/// standard header and section opcodes.
#[derive(Error, Debug, PartialEq)]
pub enum RdbError {
    #[error("invalid RDB header")]
    InvalidHeader,
    #[error("unexpected end of RDB data")]
    UnexpectedEof,
    #[error("unsupported RDB value type or string encoding")]
    UnsupportedType,
    #[error("invalid RDB data: {0}")]
    InvalidData(String),
}
