//! Connection setup for the device link.
//!
//! The exchange itself only needs `AsyncRead + AsyncWrite`; this module is
//! where the socket knobs from [`TransportConfig`] are applied.

use crate::config::TransportConfig;
use crate::exchange::ExchangeError;
use crate::{duplex_debug, duplex_info, duplex_warn};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::time::timeout;

/// Opens the single TCP connection one exchange runs over.
pub async fn connect(cfg: &TransportConfig) -> Result<TcpStream, ExchangeError> {
    let remote = cfg.remote();
    let connect_err = |source: io::Error| ExchangeError::Connect {
        address: remote.clone(),
        source,
    };

    let addr: SocketAddr = lookup_host(&remote)
        .await
        .map_err(connect_err)?
        .next()
        .ok_or_else(|| connect_err(io::Error::new(io::ErrorKind::InvalidInput, "no address resolved")))?;

    let socket = (if addr.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() })
        .map_err(connect_err)?;
    apply_buffer_hints(&socket, cfg);

    duplex_info!("Connecting to {} ...", addr);
    let stream = match timeout(cfg.connect_timeout(), socket.connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(connect_err(e)),
        Err(_) => {
            return Err(connect_err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no answer within {:?}", cfg.connect_timeout()),
            )));
        }
    };

    if let Err(e) = stream.set_nodelay(cfg.no_delay()) {
        duplex_warn!("Failed to set TCP_NODELAY on {}: {:?}", addr, e);
    }
    duplex_info!("Connected to {}", addr);
    Ok(stream)
}

/// Buffer sizes are hints: the kernel may clamp or ignore them.
fn apply_buffer_hints(socket: &TcpSocket, cfg: &TransportConfig) {
    if let Some(size) = cfg.send_buffer_hint {
        if let Err(e) = socket.set_send_buffer_size(size) {
            duplex_warn!("Send buffer hint {} rejected: {:?}", size, e);
        }
    }
    if let Some(size) = cfg.recv_buffer_hint {
        if let Err(e) = socket.set_recv_buffer_size(size) {
            duplex_warn!("Receive buffer hint {} rejected: {:?}", size, e);
        }
    }
    if let (Ok(snd), Ok(rcv)) = (socket.send_buffer_size(), socket.recv_buffer_size()) {
        duplex_debug!("Socket buffers: send {} B, recv {} B", snd, rcv);
    }
}
