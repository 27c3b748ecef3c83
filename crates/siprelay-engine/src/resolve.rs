//! Blocking name resolution and address equality.
//!
//! Resolution here is synchronous by contract: a lookup stalls the worker for
//! its duration. A caching or asynchronous resolver is a collaborator that
//! implements [`Resolve`] and gets injected; this module only carries the
//! contract, the operating-system-backed default, and the address-equality
//! check the forwarder uses for its `received` decision.

use std::net::{IpAddr, ToSocketAddrs};

use siprelay_core::{Error, Result};

/// Canonical name plus aliases from a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseEntry {
    pub canonical: String,
    pub aliases: Vec<String>,
}

/// Blocking name resolution contract.
pub trait Resolve: Send + Sync {
    /// Forward lookup: all addresses `name` resolves to, in resolver order.
    fn lookup(&self, name: &str) -> Result<Vec<IpAddr>>;

    /// Reverse lookup for `addr`.
    fn reverse(&self, addr: IpAddr) -> Result<ReverseEntry>;
}

/// Resolver backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn lookup(&self, name: &str) -> Result<Vec<IpAddr>> {
        let mut addrs: Vec<IpAddr> = (name, 0u16)
            .to_socket_addrs()
            .map_err(|e| Error::bad_address(format!("{name}: {e}")))?
            .map(|sa| sa.ip())
            .collect();
        addrs.dedup();
        if addrs.is_empty() {
            return Err(Error::bad_address(name));
        }
        Ok(addrs)
    }

    fn reverse(&self, addr: IpAddr) -> Result<ReverseEntry> {
        // the standard library has no PTR lookup; a resolver collaborator
        // that can do one implements `Resolve` and is injected instead
        Err(Error::bad_address(format!("no reverse lookup for {addr}")))
    }
}

/// Which resolution steps an address-equality check may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchMode {
    pub forward: bool,
    pub reverse: bool,
}

impl MatchMode {
    /// Forward and reverse resolution both enabled.
    pub const FULL: MatchMode = MatchMode {
        forward: true,
        reverse: true,
    };

    /// Textual comparison only; never touches the resolver.
    pub const TEXTUAL: MatchMode = MatchMode {
        forward: false,
        reverse: false,
    };
}

/// Does `declared_name` designate `ip`?
///
/// The textual fast path compares against the printed form of `ip` and never
/// calls the resolver. The enabled resolution steps run in order and the
/// first success wins; resolver failures count as "no match". No caching.
pub fn addresses_match(
    ip: IpAddr,
    declared_name: &str,
    mode: MatchMode,
    resolver: &dyn Resolve,
) -> bool {
    if declared_name == ip.to_string() {
        return true;
    }
    if mode.forward {
        if let Ok(addrs) = resolver.lookup(declared_name) {
            if addrs.contains(&ip) {
                return true;
            }
        }
    }
    if mode.reverse {
        if let Ok(entry) = resolver.reverse(ip) {
            if entry.canonical.eq_ignore_ascii_case(declared_name)
                || entry
                    .aliases
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(declared_name))
            {
                return true;
            }
        }
    }
    false
}
