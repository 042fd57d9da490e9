use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use super::codec::{self, Command, SetHeader};
use super::error::ProtocolError;
use crate::cache::Cache;

/// What the connection task should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading lines.
    Continue,
    /// The client sent `quit`; close the connection.
    Close,
}

/// The two modes a session can be in.
#[derive(Debug)]
pub enum SessionState {
    /// Accepting `get`/`set`/`quit` command lines.
    Command,
    /// Accumulating payload lines for a previously accepted `set` header.
    Data { header: SetHeader, buffer: BytesMut },
}

/// Per-connection protocol state machine.
///
/// Not thread safe; one session is created per client connection. The
/// session starts in [`SessionState::Command`], transitions to
/// [`SessionState::Data`] when a `set` header arrives, and returns to
/// command mode once the declared number of payload bytes has been
/// received (or the payload overruns the declaration).
///
/// Protocol faults are written to `out` as memcache error lines and never
/// close the connection; only `quit` (or the transport failing) does.
pub struct Session {
    cache: Arc<dyn Cache>,
    state: SessionState,
}

impl Session {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            state: SessionState::Command,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handles one framed line (delimiter already stripped), appending any
    /// response bytes to `out`.
    pub fn handle_line(&mut self, line: &[u8], out: &mut BytesMut) -> Action {
        match std::mem::replace(&mut self.state, SessionState::Command) {
            SessionState::Command => self.handle_command(line, out),
            SessionState::Data { header, buffer } => {
                self.handle_data(header, buffer, line, out);
                Action::Continue
            }
        }
    }

    fn handle_command(&mut self, line: &[u8], out: &mut BytesMut) -> Action {
        let Ok(text) = std::str::from_utf8(line) else {
            codec::write_error(out, &ProtocolError::InvalidCommand);
            return Action::Continue;
        };

        match codec::parse_command(text) {
            Ok(Command::Get { keys }) => {
                for key in &keys {
                    match self.cache.get(key) {
                        Ok(Some(value)) => codec::write_value(out, key, &value),
                        Ok(None) => {}
                        Err(e) => {
                            codec::write_error(out, &ProtocolError::Server(e.to_string()));
                            return Action::Continue;
                        }
                    }
                }
                codec::write_end(out);
                Action::Continue
            }
            Ok(Command::Set(header)) => {
                // No response until the payload arrives.
                debug!(key = %header.key, bytes = header.bytes, "awaiting payload");
                self.state = SessionState::Data {
                    header,
                    buffer: BytesMut::new(),
                };
                Action::Continue
            }
            Ok(Command::Quit) => Action::Close,
            Err(e) => {
                codec::write_error(out, &e);
                Action::Continue
            }
        }
    }

    fn handle_data(
        &mut self,
        header: SetHeader,
        mut buffer: BytesMut,
        line: &[u8],
        out: &mut BytesMut,
    ) {
        buffer.extend_from_slice(line);
        // The framer consumed the line delimiter; while the payload is
        // still short of the declaration, the delimiter must have been
        // part of the value, so restore it as `\n`.
        if buffer.len() < header.bytes {
            buffer.extend_from_slice(b"\n");
        }

        if buffer.len() == header.bytes {
            match self.cache.put(&header.key, buffer.freeze()) {
                Ok(()) => {
                    if !header.noreply {
                        codec::write_stored(out);
                    }
                }
                Err(e) => codec::write_error(out, &ProtocolError::Server(e.to_string())),
            }
        } else if buffer.len() > header.bytes {
            codec::write_error(out, &ProtocolError::Client("Data size exceeded".into()));
        } else {
            self.state = SessionState::Data { header, buffer };
        }
    }
}
