//! Destination entries: resolved next hops with failover bookkeeping.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use siprelay_core::{Error, Result, SIP_PORT};

use crate::resolve::Resolve;

/// Rotating cursor into the address list plus health flag.
#[derive(Debug)]
struct FailoverState {
    cursor: usize,
    healthy: bool,
}

/// One resolved next hop.
///
/// The address list is resolved once at construction and never refreshed
/// here; a longer-lived health-check subsystem owns real reachability state.
/// Entries created per forwarding decision are plain owned values. Entries
/// wired into a route script (`send`, `forward` to a named proxy) are shared
/// behind `Arc`; cursor and health sit behind a mutex and the counters are
/// atomic, so concurrent use needs no external discipline.
#[derive(Debug)]
pub struct DestEntry {
    name: String,
    port: u16,
    addrs: Vec<IpAddr>,
    state: Mutex<FailoverState>,
    tx_count: AtomicU64,
    tx_bytes: AtomicU64,
    errors: AtomicU64,
}

/// Counter snapshot for a destination entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestStats {
    pub sent: u64,
    pub sent_bytes: u64,
    pub errors: u64,
}

impl DestEntry {
    /// Resolve `name` once and build a failover-capable destination.
    ///
    /// A `port` of 0 selects the default SIP port at send time.
    pub fn new(name: impl Into<String>, port: u16, resolver: &dyn Resolve) -> Result<Self> {
        let name = name.into();
        let addrs = resolver.lookup(&name)?;
        if addrs.is_empty() {
            return Err(Error::bad_address(name));
        }
        Ok(DestEntry {
            name,
            port,
            addrs,
            state: Mutex::new(FailoverState {
                cursor: 0,
                healthy: true,
            }),
            tx_count: AtomicU64::new(0),
            tx_bytes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    /// Declared hostname of this destination.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port used for transmission, with the default-port fallback applied.
    pub fn port(&self) -> u16 {
        if self.port == 0 {
            SIP_PORT
        } else {
            self.port
        }
    }

    /// Resolved addresses, in resolver order.
    pub fn addrs(&self) -> &[IpAddr] {
        &self.addrs
    }

    /// Address for the next transmission.
    ///
    /// A suspect entry rotates the cursor once (wrapping) and is treated as
    /// healthy again until the next failure; there is no verified recheck at
    /// this layer.
    pub fn select_addr(&self) -> SocketAddr {
        let mut state = self.state.lock();
        if !state.healthy {
            state.cursor = (state.cursor + 1) % self.addrs.len();
            state.healthy = true;
        }
        SocketAddr::new(self.addrs[state.cursor], self.port())
    }

    /// Record a delivery failure; the entry becomes suspect and the next use
    /// rotates to the following address.
    pub fn mark_failed(&self) {
        self.state.lock().healthy = false;
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful transmission of `bytes` bytes.
    pub fn record_sent(&self, bytes: usize) {
        self.tx_count.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.state.lock().healthy
    }

    /// Current cursor position into the address list.
    pub fn cursor(&self) -> usize {
        self.state.lock().cursor
    }

    /// Snapshot of the transmit and error counters.
    pub fn stats(&self) -> DestStats {
        DestStats {
            sent: self.tx_count.load(Ordering::Relaxed),
            sent_bytes: self.tx_bytes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ReverseEntry;

    struct FixedResolver(Vec<IpAddr>);

    impl Resolve for FixedResolver {
        fn lookup(&self, _name: &str) -> Result<Vec<IpAddr>> {
            Ok(self.0.clone())
        }
        fn reverse(&self, addr: IpAddr) -> Result<ReverseEntry> {
            Err(Error::bad_address(addr.to_string()))
        }
    }

    fn entry() -> DestEntry {
        let resolver = FixedResolver(vec![
            "10.0.0.1".parse().unwrap(),
            "10.0.0.2".parse().unwrap(),
            "10.0.0.3".parse().unwrap(),
        ]);
        DestEntry::new("gw.example.com", 0, &resolver).unwrap()
    }

    #[test]
    fn empty_resolution_is_rejected() {
        let resolver = FixedResolver(vec![]);
        assert!(DestEntry::new("gw.example.com", 0, &resolver).is_err());
    }

    #[test]
    fn port_zero_falls_back_to_sip_default() {
        assert_eq!(entry().port(), SIP_PORT);
    }

    #[test]
    fn healthy_entry_keeps_its_cursor() {
        let e = entry();
        assert_eq!(e.select_addr().ip().to_string(), "10.0.0.1");
        assert_eq!(e.select_addr().ip().to_string(), "10.0.0.1");
    }

    #[test]
    fn suspect_entry_rotates_once_and_recovers() {
        let e = entry();
        // walk the cursor to the last address
        e.mark_failed();
        assert_eq!(e.select_addr().ip().to_string(), "10.0.0.2");
        e.mark_failed();
        assert_eq!(e.select_addr().ip().to_string(), "10.0.0.3");

        // wrap: failure at the end rotates back to the first address
        e.mark_failed();
        assert!(!e.is_healthy());
        assert_eq!(e.select_addr().ip().to_string(), "10.0.0.1");
        assert!(e.is_healthy());

        // a later failure marks it suspect without moving the cursor yet
        e.mark_failed();
        assert_eq!(e.cursor(), 0);
        assert!(!e.is_healthy());
    }

    #[test]
    fn counters_accumulate() {
        let e = entry();
        e.record_sent(100);
        e.record_sent(50);
        e.mark_failed();
        let stats = e.stats();
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.sent_bytes, 150);
        assert_eq!(stats.errors, 1);
    }
}
