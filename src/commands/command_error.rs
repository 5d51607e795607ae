use thiserror::Error;

use crate::resp::RespValue;
use crate::types::StreamIdError;

/// Command-level failures. Each variant renders to the RESP error reply the
/// client sees; none of them abort the dispatch loop or the session.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("value is not an integer or out of range")]
    NotAnInteger,
    #[error("value is not a valid float")]
    NotAFloat,
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("{0}")]
    StreamId(#[from] StreamIdError),
    #[error("MULTI calls can not be nested")]
    NestedMulti,
    #[error("EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("{0} is not allowed in transactions")]
    BlockingInTransaction(String),
    #[error("invalid username-password pair or user is disabled.")]
    WrongPass,
    #[error("no such user")]
    UserNotFound,
    #[error("invalid longitude,latitude pair {0},{1}")]
    InvalidCoordinates(String, String),
    #[error(
        "Can't execute '{0}': only (P|S)SUBSCRIBE / (P|S)UNSUBSCRIBE / PING / QUIT / RESET are allowed in this context"
    )]
    NotAllowedWhileSubscribed(String),
    #[error("replica can only process read commands from clients")]
    ReplicaReadOnly,
}

impl CommandError {
    /// The encoded error reply. WRONGPASS and WRONGTYPE carry their own
    /// Redis error codes; everything else goes out under ERR.
    pub fn to_resp(&self) -> String {
        let message = match self {
            CommandError::WrongPass => format!("WRONGPASS {}", self),
            CommandError::WrongType => format!("WRONGTYPE {}", self),
            _ => format!("ERR {}", self),
        };

        RespValue::Error(message).encode()
    }
}
