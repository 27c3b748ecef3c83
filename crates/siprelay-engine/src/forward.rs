//! Stateless message forwarding.
//!
//! The request path inserts this hop's Via (and, when the packet source does
//! not match the declared sender, a `received` parameter) into a fresh copy
//! of the wire buffer. The reply path strips the top Via and relays toward
//! the second one. Nothing is kept between a request and its replies.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use siprelay_core::{Error, Result, SipMsg, SIP_PORT};

use crate::config::ForwardConfig;
use crate::dest::DestEntry;
use crate::resolve::{addresses_match, MatchMode, Resolve};
use crate::splice::{materialize, Splice};
use crate::transport::Transport;

/// Upper bound for one generated Via line.
pub const MAX_VIA_LINE: usize = 240;

/// Upper bound for a generated `received` parameter.
pub const MAX_RECEIVED: usize = 57;

/// The stateless forwarding engine.
pub struct Forwarder {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn Resolve>,
    config: ForwardConfig,
}

impl Forwarder {
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn Resolve>,
        config: ForwardConfig,
    ) -> Self {
        Forwarder {
            transport,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    /// Forward a request toward `dest`.
    ///
    /// The output buffer is exactly the input plus the new Via line plus the
    /// `received` parameter when one is needed. Address selection applies the
    /// entry's failover policy; a send failure marks the entry suspect.
    pub fn forward_request(&self, msg: &SipMsg, dest: &DestEntry) -> Result<()> {
        let via1 = msg
            .via1
            .as_ref()
            .ok_or_else(|| Error::unspecified("request has no Via header"))?;

        let via_line = format!(
            "Via: SIP/2.0/UDP {}:{}\r\n",
            self.config.local_name, self.config.local_port
        );
        if via_line.len() > MAX_VIA_LINE {
            return Err(Error::capacity(format!(
                "Via line of {} bytes exceeds {MAX_VIA_LINE}",
                via_line.len()
            )));
        }

        // record the observed source when it does not match the declared one
        let received = if addresses_match(
            msg.src_ip(),
            &via1.host,
            MatchMode::FULL,
            self.resolver.as_ref(),
        ) {
            None
        } else {
            let param = format!(";received={}", msg.src_ip());
            if param.len() > MAX_RECEIVED {
                return Err(Error::capacity(format!(
                    "received parameter of {} bytes exceeds {MAX_RECEIVED}",
                    param.len()
                )));
            }
            Some(param)
        };

        let raw = msg.raw();
        let mut ops = vec![
            Splice::Copy(0..via1.hdr_start),
            Splice::Insert(via_line.as_bytes()),
        ];
        match &received {
            Some(param) => {
                let at = via1.received_insert_at();
                ops.push(Splice::Copy(via1.hdr_start..at));
                ops.push(Splice::Insert(param.as_bytes()));
                ops.push(Splice::Copy(at..raw.len()));
            }
            None => ops.push(Splice::Copy(via1.hdr_start..raw.len())),
        }
        let out = materialize(raw, &ops)?;
        debug_assert_eq!(
            out.len(),
            raw.len() + via_line.len() + received.as_ref().map_or(0, String::len)
        );

        let addr = dest.select_addr();
        match self.transport.send(&out, addr) {
            Ok(()) => {
                dest.record_sent(out.len());
                debug!("forwarded {} bytes to {} ({})", out.len(), addr, dest.name());
                Ok(())
            }
            Err(e) => {
                dest.mark_failed();
                warn!("send to {} ({}) failed: {}", addr, dest.name(), e);
                Err(e)
            }
        }
    }

    /// Transmit the raw message bytes to `dest`, no Via work.
    pub fn send_raw(&self, msg: &SipMsg, dest: &DestEntry) -> Result<()> {
        let addr = dest.select_addr();
        match self.transport.send(msg.raw(), addr) {
            Ok(()) => {
                dest.record_sent(msg.len());
                debug!("sent {} raw bytes to {} ({})", msg.len(), addr, dest.name());
                Ok(())
            }
            Err(e) => {
                dest.mark_failed();
                warn!("send to {} ({}) failed: {}", addr, dest.name(), e);
                Err(e)
            }
        }
    }

    /// Relay a reply along the Via chain.
    ///
    /// The top Via — ours, when checking is enabled — is stripped and the
    /// message goes to the host the second Via declares. A reply that fails
    /// the own-Via check is dropped, not corrected.
    pub fn forward_reply(&self, msg: &SipMsg) -> Result<()> {
        let via1 = msg
            .via1
            .as_ref()
            .ok_or_else(|| Error::unspecified("reply has no Via header"))?;

        if self.config.check_own_via && !self.is_local_name(&via1.host) {
            warn!("top Via host {} is not local, dropping reply", via1.host);
            return Err(Error::unspecified(format!(
                "top Via host {} is not ours",
                via1.host
            )));
        }

        let via2 = msg
            .via2
            .as_ref()
            .ok_or_else(|| Error::unspecified("reply has no second Via header"))?;

        let raw = msg.raw();
        let (start, len) = via1.removal_span();
        let out = materialize(
            raw,
            &[Splice::Copy(0..start), Splice::Copy(start + len..raw.len())],
        )?;
        debug_assert_eq!(out.len(), raw.len() - len);

        let addrs = self.resolver.lookup(&via2.host)?;
        let ip = addrs
            .first()
            .copied()
            .ok_or_else(|| Error::bad_address(via2.host.clone()))?;
        let addr = SocketAddr::new(ip, via2.port.unwrap_or(SIP_PORT));

        self.transport.send(&out, addr)?;
        debug!("relayed reply of {} bytes to {}", out.len(), addr);
        Ok(())
    }

    fn is_local_name(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.config.local_name)
            || self
                .config
                .aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(host))
    }
}
