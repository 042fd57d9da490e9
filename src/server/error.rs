use thiserror::Error;

/// Protocol faults reported to the client as memcache error lines.
///
/// All three variants are recovered locally by the session: the error line
/// is written to the connection and the state machine returns to accepting
/// commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unknown verb or malformed command header.
    #[error("ERROR")]
    InvalidCommand,

    /// Well-formed but semantically invalid request.
    #[error("CLIENT_ERROR {0}")]
    Client(String),

    /// Internal fault surfaced while serving a request.
    #[error("SERVER_ERROR {0}")]
    Server(String),
}

/// Errors that end a single connection. Never reported on the wire.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The client sent a line longer than the frame limit.
    #[error("frame exceeds {0} bytes")]
    FrameTooLong(usize),
}
