use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::error::ConnectionError;

/// Maximum length of a single line, excluding the delimiter.
pub const MAX_FRAME_LENGTH: usize = 8192;

/// Line framing over a TCP stream.
///
/// Yields one frame per `\n`, with the delimiter and one trailing `\r`
/// stripped. A line longer than [`MAX_FRAME_LENGTH`] is a fatal connection
/// error.
pub struct LineTransport {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl LineTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Reads the next line. Returns `None` when the client closed the
    /// connection; bytes after the last delimiter are discarded.
    pub async fn read_line(&mut self) -> Result<Option<Bytes>, ConnectionError> {
        loop {
            if let Some(pos) = self.read_buf.iter().position(|&b| b == b'\n') {
                if pos > MAX_FRAME_LENGTH {
                    return Err(ConnectionError::FrameTooLong(MAX_FRAME_LENGTH));
                }
                let mut frame = self.read_buf.split_to(pos + 1);
                frame.truncate(pos);
                if frame.last() == Some(&b'\r') {
                    frame.truncate(pos - 1);
                }
                return Ok(Some(frame.freeze()));
            }

            if self.read_buf.len() > MAX_FRAME_LENGTH {
                return Err(ConnectionError::FrameTooLong(MAX_FRAME_LENGTH));
            }

            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
        }
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}
