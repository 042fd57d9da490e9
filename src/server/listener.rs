use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::error::ConnectionError;
use super::session::{Action, Session};
use super::transport::LineTransport;
use crate::cache::Cache;

/// Accepts connections on `listener` and serves each one on its own task
/// until the listener fails. Connection-level errors are logged and never
/// tear down the accept loop.
pub async fn serve(listener: TcpListener, cache: Arc<dyn Cache>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "client connected");

        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, cache).await {
                warn!(%addr, error = %e, "connection error");
            }
            debug!(%addr, "client disconnected");
        });
    }
}

async fn handle_connection(stream: TcpStream, cache: Arc<dyn Cache>) -> Result<(), ConnectionError> {
    let mut transport = LineTransport::new(stream);
    let mut session = Session::new(cache);
    let mut out = BytesMut::new();

    while let Some(line) = transport.read_line().await? {
        out.clear();
        let action = session.handle_line(&line, &mut out);
        if !out.is_empty() {
            transport.write_all(&out).await?;
        }
        if action == Action::Close {
            break;
        }
    }

    Ok(())
}
