//! UDP send path.
//!
//! Only the UDP transport is in scope here; the receive loop and the other
//! transports belong to the surrounding server. Sends are synchronous — one
//! datagram per call, no queueing.

use std::fmt;
use std::net::{SocketAddr, UdpSocket};

use tracing::{info, trace};

use siprelay_core::{Error, Result};

/// Maximum UDP datagram this transport will emit.
pub const MAX_UDP_PACKET_SIZE: usize = 65_507;

/// Datagram send contract used by the forwarding engine.
pub trait Transport: Send + Sync {
    /// Transmit `buf` to `dst` as a single datagram.
    fn send(&self, buf: &[u8], dst: SocketAddr) -> Result<()>;
}

/// UDP transport for SIP messages.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a socket for outbound signaling.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        info!("SIP UDP transport bound to {}", socket.local_addr()?);
        Ok(UdpTransport { socket })
    }

    /// The actual bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Error::from)
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8], dst: SocketAddr) -> Result<()> {
        if buf.len() > MAX_UDP_PACKET_SIZE {
            return Err(Error::capacity(format!(
                "datagram of {} bytes exceeds {}",
                buf.len(),
                MAX_UDP_PACKET_SIZE
            )));
        }
        self.socket.send_to(buf, dst)?;
        trace!("sent {} bytes to {}", buf.len(), dst);
        Ok(())
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket.local_addr() {
            Ok(addr) => write!(f, "UdpTransport({addr})"),
            Err(_) => write!(f, "UdpTransport(<error>)"),
        }
    }
}
