//! Shared fixtures for the engine integration tests: a recording transport,
//! a scripted resolver with call counters, and a small Via scanner that
//! builds the offset views an upstream parser would normally provide.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use siprelay_engine::{
    Action, Error, ForwardConfig, Forwarder, Interpreter, ModuleRegistry, Resolve, Result,
    ReverseEntry, RouteTable, SipMsg, Transport, ViaInfo,
};

/// Transport that records every datagram instead of sending it.
pub struct MockTransport {
    sent: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(MockTransport {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    /// Make subsequent sends fail until reset.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Transport for MockTransport {
    fn send(&self, buf: &[u8], dst: SocketAddr) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock send failure",
            )
            .into());
        }
        self.sent.lock().push((buf.to_vec(), dst));
        Ok(())
    }
}

/// Resolver with scripted answers and call counters.
#[derive(Default)]
pub struct ScriptResolver {
    forward: HashMap<String, Vec<IpAddr>>,
    reverse: HashMap<IpAddr, ReverseEntry>,
    lookups: AtomicUsize,
    reverses: AtomicUsize,
}

impl ScriptResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, name: &str, addrs: &[&str]) -> Self {
        self.forward.insert(
            name.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }

    pub fn with_reverse(mut self, addr: &str, canonical: &str, aliases: &[&str]) -> Self {
        self.reverse.insert(
            addr.parse().unwrap(),
            ReverseEntry {
                canonical: canonical.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            },
        );
        self
    }

    /// Total resolver invocations, forward and reverse.
    pub fn calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst) + self.reverses.load(Ordering::SeqCst)
    }
}

impl Resolve for ScriptResolver {
    fn lookup(&self, name: &str) -> Result<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.forward
            .get(name)
            .cloned()
            .ok_or_else(|| Error::bad_address(name))
    }

    fn reverse(&self, addr: IpAddr) -> Result<ReverseEntry> {
        self.reverses.fetch_add(1, Ordering::SeqCst);
        self.reverse
            .get(&addr)
            .cloned()
            .ok_or_else(|| Error::bad_address(addr.to_string()))
    }
}

/// Scan `raw` for Via lines and build the offset views the upstream message
/// parser would provide. Handles one value per line plus comma folding.
pub fn scan_vias(raw: &str) -> Vec<ViaInfo> {
    let mut vias = Vec::new();
    let mut line_start = 0usize;
    for line in raw.split_inclusive("\r\n") {
        let start = line_start;
        line_start += line.len();
        if !line.starts_with("Via:") || !line.ends_with("\r\n") {
            continue;
        }
        let body = &line[4..line.len() - 2];
        let values: Vec<&str> = body.split(',').collect();
        let count = values.len();
        let mut value_off = 4usize;
        for (i, value) in values.into_iter().enumerate() {
            let folded_next = i + 1 < count;
            let lead = value.len() - value.trim_start().len();
            let v = value.trim_start();
            let after_proto = v.find(' ').map(|p| p + 1).unwrap_or(0);
            let rest = &v[after_proto..];
            let hp_len = rest.find(';').unwrap_or(rest.len());
            let hostport = &rest[..hp_len];
            let (host, port) = match hostport.rsplit_once(':') {
                Some((h, p)) => (h.to_string(), p.parse::<u16>().ok()),
                None => (hostport.to_string(), None),
            };
            let value_abs = start + value_off + lead;
            let host_end = value_abs + after_proto + hostport.len();
            let params_start = if hp_len < rest.len() {
                Some(value_abs + after_proto + hp_len)
            } else {
                None
            };
            let (hdr_start, hdr_len) = if i == 0 && folded_next {
                // span through the comma ending this value
                (start, value_off + value.len() + 1)
            } else {
                (start, line.len())
            };
            vias.push(ViaInfo {
                host,
                port,
                hdr_start,
                hdr_len,
                name_len: 3,
                host_end,
                params_start,
                folded_next,
            });
            value_off += value.len() + 1;
        }
    }
    vias
}

/// Build a `SipMsg` from raw text the way the surrounding server would.
pub fn parse_test_msg(raw: &str, src: &str) -> SipMsg {
    let src: SocketAddr = src.parse().unwrap();
    let first_line_end = raw.find("\r\n").expect("first line");
    let request_uri = raw[..first_line_end]
        .split(' ')
        .nth(1)
        .expect("request uri")
        .to_string();
    let mut msg = SipMsg::new(raw.as_bytes().to_vec(), request_uri, src);
    let mut vias = scan_vias(raw).into_iter();
    msg.via1 = vias.next();
    msg.via2 = vias.next();
    msg
}

pub struct TestEngine {
    pub transport: Arc<MockTransport>,
    pub resolver: Arc<ScriptResolver>,
    pub engine: Interpreter,
}

pub fn engine_with(
    routes: RouteTable,
    modules: ModuleRegistry,
    resolver: ScriptResolver,
    config: ForwardConfig,
) -> TestEngine {
    let transport = MockTransport::new();
    let resolver = Arc::new(resolver);
    let forwarder = Forwarder::new(transport.clone(), resolver.clone(), config);
    let engine = Interpreter::new(
        Arc::new(routes),
        Arc::new(modules),
        resolver.clone(),
        forwarder,
    );
    TestEngine {
        transport,
        resolver,
        engine,
    }
}

pub fn forwarder_with(
    resolver: ScriptResolver,
    config: ForwardConfig,
) -> (Arc<MockTransport>, Arc<ScriptResolver>, Forwarder) {
    let transport = MockTransport::new();
    let resolver = Arc::new(resolver);
    let forwarder = Forwarder::new(transport.clone(), resolver.clone(), config);
    (transport, resolver, forwarder)
}

/// Shared execution log for observing action order.
pub type RunLog = Arc<Mutex<Vec<String>>>;

pub fn run_log() -> RunLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Module-command action that appends `label` to the log and continues.
pub fn mark(log: &RunLog, label: &str) -> Action {
    marked(log, label, 1)
}

/// Module-command action that appends `label` and returns `outcome`.
pub fn marked(log: &RunLog, label: &str, outcome: i32) -> Action {
    let log = log.clone();
    let label = label.to_string();
    Action::ModuleCall {
        command: Arc::new(move |_msg: &mut SipMsg, _p1: &str, _p2: &str| {
            log.lock().push(label.clone());
            outcome
        }),
        param1: String::new(),
        param2: String::new(),
    }
}

/// Module-command action that just returns `outcome`.
pub fn returning(outcome: i32) -> Action {
    Action::ModuleCall {
        command: Arc::new(move |_msg: &mut SipMsg, _p1: &str, _p2: &str| outcome),
        param1: String::new(),
        param2: String::new(),
    }
}
