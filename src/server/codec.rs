//! Command parsing and response encoding for the memcache text protocol.

use bytes::BytesMut;

use super::error::ProtocolError;
use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get <key> [<key> ...]`
    Get { keys: Vec<String> },
    /// `set <key> <flags> <exptime> <bytes> [noreply]`
    Set(SetHeader),
    /// `quit`
    Quit,
}

/// Header of a `set` command. The payload follows on subsequent lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetHeader {
    pub key: String,
    /// Accepted and validated, but not round-tripped; `VALUE` lines always
    /// emit `0`.
    pub flags: u32,
    /// Parsed for wire compatibility; expiration is not implemented.
    pub exptime: i64,
    /// Declared payload length in bytes.
    pub bytes: usize,
    /// Suppresses the `STORED` acknowledgement.
    pub noreply: bool,
}

/// Parses one command line. Verbs are matched exactly; an unknown verb or
/// malformed header is an invalid command.
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("get") => parse_get(tokens),
        Some("set") => parse_set(tokens),
        Some("quit") => match tokens.next() {
            None => Ok(Command::Quit),
            Some(_) => Err(ProtocolError::InvalidCommand),
        },
        _ => Err(ProtocolError::InvalidCommand),
    }
}

fn parse_get<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Command, ProtocolError> {
    let keys = tokens.map(parse_key).collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(ProtocolError::InvalidCommand);
    }
    Ok(Command::Get { keys })
}

fn parse_set<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<Command, ProtocolError> {
    let key = parse_key(tokens.next().ok_or(ProtocolError::InvalidCommand)?)?;
    let flags = parse_number::<u32>(tokens.next())?;
    let exptime = parse_number::<i64>(tokens.next())?;
    let bytes = parse_number::<usize>(tokens.next())?;
    if bytes > MAX_VALUE_SIZE {
        return Err(ProtocolError::Client("value too large".into()));
    }

    let noreply = match tokens.next() {
        None => false,
        Some("noreply") => true,
        Some(_) => return Err(ProtocolError::InvalidCommand),
    };
    if tokens.next().is_some() {
        return Err(ProtocolError::InvalidCommand);
    }

    Ok(Command::Set(SetHeader {
        key,
        flags,
        exptime,
        bytes,
        noreply,
    }))
}

fn parse_key(token: &str) -> Result<String, ProtocolError> {
    if token.len() > MAX_KEY_LENGTH {
        return Err(ProtocolError::Client("key too long".into()));
    }
    Ok(token.to_owned())
}

fn parse_number<T: std::str::FromStr>(token: Option<&str>) -> Result<T, ProtocolError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or(ProtocolError::InvalidCommand)
}

/// Appends `VALUE <key> 0 <len>\r\n<value>\r\n`.
pub fn write_value(out: &mut BytesMut, key: &str, value: &[u8]) {
    out.extend_from_slice(format!("VALUE {} 0 {}\r\n", key, value.len()).as_bytes());
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
}

/// Appends the `END\r\n` marker terminating a `get` response.
pub fn write_end(out: &mut BytesMut) {
    out.extend_from_slice(b"END\r\n");
}

/// Appends the `STORED\r\n` acknowledgement.
pub fn write_stored(out: &mut BytesMut) {
    out.extend_from_slice(b"STORED\r\n");
}

/// Appends the wire rendering of a protocol error.
pub fn write_error(out: &mut BytesMut, error: &ProtocolError) {
    out.extend_from_slice(error.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_single_key() {
        let command = parse_command("get some-key").unwrap();
        assert_eq!(
            command,
            Command::Get {
                keys: vec!["some-key".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_get_multiple_keys() {
        let command = parse_command("get k1 k2 k3").unwrap();
        assert_eq!(
            command,
            Command::Get {
                keys: vec!["k1".to_string(), "k2".to_string(), "k3".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_get_without_keys() {
        assert_eq!(parse_command("get"), Err(ProtocolError::InvalidCommand));
    }

    #[test]
    fn test_parse_set() {
        let command = parse_command("set some-key 7 42 5").unwrap();
        assert_eq!(
            command,
            Command::Set(SetHeader {
                key: "some-key".to_string(),
                flags: 7,
                exptime: 42,
                bytes: 5,
                noreply: false,
            })
        );
    }

    #[test]
    fn test_parse_set_noreply() {
        match parse_command("set k 0 0 3 noreply").unwrap() {
            Command::Set(header) => assert!(header.noreply),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_set_negative_exptime() {
        match parse_command("set k 0 -1 3").unwrap() {
            Command::Set(header) => assert_eq!(header.exptime, -1),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_set_rejects_bad_tokens() {
        // Too few tokens.
        assert_eq!(
            parse_command("set k 0 0"),
            Err(ProtocolError::InvalidCommand)
        );
        // Unparseable numbers.
        assert_eq!(
            parse_command("set k x 0 5"),
            Err(ProtocolError::InvalidCommand)
        );
        assert_eq!(
            parse_command("set k 0 0 -5"),
            Err(ProtocolError::InvalidCommand)
        );
        // Negative flags.
        assert_eq!(
            parse_command("set k -1 0 5"),
            Err(ProtocolError::InvalidCommand)
        );
        // Sixth token must be the literal `noreply`.
        assert_eq!(
            parse_command("set k 0 0 5 true"),
            Err(ProtocolError::InvalidCommand)
        );
        // Nothing may follow it.
        assert_eq!(
            parse_command("set k 0 0 5 noreply extra"),
            Err(ProtocolError::InvalidCommand)
        );
    }

    #[test]
    fn test_parse_set_rejects_oversized_declaration() {
        let line = format!("set k 0 0 {}", MAX_VALUE_SIZE + 1);
        assert_eq!(
            parse_command(&line),
            Err(ProtocolError::Client("value too large".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_long_key() {
        let key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert_eq!(
            parse_command(&format!("get {key}")),
            Err(ProtocolError::Client("key too long".to_string()))
        );
        assert_eq!(
            parse_command(&format!("set {key} 0 0 5")),
            Err(ProtocolError::Client("key too long".to_string()))
        );
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_command("quit").unwrap(), Command::Quit);
        assert_eq!(
            parse_command("quit now"),
            Err(ProtocolError::InvalidCommand)
        );
    }

    #[test]
    fn test_parse_unknown_verbs() {
        assert_eq!(parse_command("foo bar"), Err(ProtocolError::InvalidCommand));
        assert_eq!(parse_command(""), Err(ProtocolError::InvalidCommand));
        // Exact verb match: `gets` is not `get`.
        assert_eq!(parse_command("gets k"), Err(ProtocolError::InvalidCommand));
    }

    #[test]
    fn test_encode_value_and_end() {
        let mut out = BytesMut::new();
        write_value(&mut out, "key1", b"value1");
        write_end(&mut out);
        assert_eq!(&out[..], b"VALUE key1 0 6\r\nvalue1\r\nEND\r\n".as_slice());
    }

    #[test]
    fn test_encode_value_always_emits_zero_flags() {
        let mut out = BytesMut::new();
        write_value(&mut out, "k", b"");
        assert_eq!(&out[..], b"VALUE k 0 0\r\n\r\n".as_slice());
    }

    #[test]
    fn test_encode_errors() {
        let mut out = BytesMut::new();
        write_error(&mut out, &ProtocolError::InvalidCommand);
        write_error(&mut out, &ProtocolError::Client("Data size exceeded".into()));
        write_error(&mut out, &ProtocolError::Server("boom".into()));
        assert_eq!(
            &out[..],
            b"ERROR\r\nCLIENT_ERROR Data size exceeded\r\nSERVER_ERROR boom\r\n".as_slice()
        );
    }

    #[test]
    fn test_value_line_reparses() {
        // A conformant reader splits the header line on whitespace and
        // then takes exactly <len> payload bytes.
        let mut out = BytesMut::new();
        write_value(&mut out, "key1", b"val\nue");
        write_end(&mut out);

        let header_end = out.iter().position(|&b| b == b'\n').unwrap() + 1;
        let header = std::str::from_utf8(&out[..header_end - 2]).unwrap();
        let fields: Vec<&str> = header.split_whitespace().collect();
        assert_eq!(fields[0], "VALUE");
        assert_eq!(fields[1], "key1");
        assert_eq!(fields[2], "0");
        let len: usize = fields[3].parse().unwrap();

        let payload = &out[header_end..header_end + len];
        assert_eq!(payload, b"val\nue");
        assert_eq!(&out[header_end + len..], b"\r\nEND\r\n".as_slice());
    }

    #[test]
    fn test_stored_marker() {
        let mut out = BytesMut::new();
        write_stored(&mut out);
        assert_eq!(&out[..], b"STORED\r\n".as_slice());
    }
}
