//! Consumed view of one inbound SIP message.
//!
//! Parsing happens upstream; the routing core sees the original wire bytes
//! plus the structured fields it acts on. The buffer is never mutated in
//! place — forwarding builds a fresh copy and routing decisions only touch
//! the replacement Request-URI slot.

use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;

use crate::via::ViaInfo;

/// Default SIP signaling port.
pub const SIP_PORT: u16 = 5060;

/// One SIP message in flight through the routing core.
#[derive(Debug, Clone)]
pub struct SipMsg {
    buf: Bytes,
    request_uri: String,
    new_uri: Option<String>,
    /// First Via header, when the parser found one
    pub via1: Option<ViaInfo>,
    /// Second Via header, used when relaying replies
    pub via2: Option<ViaInfo>,
    src_ip: IpAddr,
    src_port: u16,
}

impl SipMsg {
    /// Wrap a received message.
    ///
    /// `buf` holds exactly the bytes read from the wire; `request_uri` is the
    /// Request-URI text from the first line; `src` is the packet source.
    pub fn new(buf: impl Into<Bytes>, request_uri: impl Into<String>, src: SocketAddr) -> Self {
        SipMsg {
            buf: buf.into(),
            request_uri: request_uri.into(),
            new_uri: None,
            via1: None,
            via2: None,
            src_ip: src.ip(),
            src_port: src.port(),
        }
    }

    /// The original wire bytes.
    pub fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes actually received.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Source address of the packet.
    pub fn src_ip(&self) -> IpAddr {
        self.src_ip
    }

    /// Source port of the packet.
    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    /// The Request-URI as received.
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    /// The replacement Request-URI, if one was installed.
    pub fn new_uri(&self) -> Option<&str> {
        self.new_uri.as_deref()
    }

    /// Install a replacement Request-URI, dropping any previous one.
    ///
    /// At most one replacement exists per message.
    pub fn set_new_uri(&mut self, uri: impl Into<String>) {
        self.new_uri = Some(uri.into());
    }

    /// Remove the replacement Request-URI.
    pub fn clear_new_uri(&mut self) {
        self.new_uri = None;
    }

    /// The URI a forwarding decision targets: the replacement when present,
    /// the original otherwise.
    pub fn effective_uri(&self) -> &str {
        self.new_uri.as_deref().unwrap_or(&self.request_uri)
    }
}
