//! Minimal end-to-end wiring: one route that logs, rewrites the Request-URI
//! and forwards the message to a loopback receiver.
//!
//! Run with: cargo run -p siprelay-engine --example static_route

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::Duration;

use siprelay_engine::{
    setup_logging, Action, DestEntry, ForwardConfig, ForwardDest, Forwarder, Interpreter,
    LoggingConfig, Module, ModuleRegistry, RouteTable, SipMsg, SystemResolver, UdpTransport,
    ViaInfo,
};

fn main() -> siprelay_engine::Result<()> {
    setup_logging(LoggingConfig::default())?;

    // the "next hop": a plain UDP receiver on loopback
    let receiver = UdpSocket::bind("127.0.0.1:0")?;
    receiver.set_read_timeout(Some(Duration::from_secs(2)))?;
    let next_hop = receiver.local_addr()?;

    let resolver = Arc::new(SystemResolver);
    let transport = Arc::new(UdpTransport::bind("127.0.0.1:0".parse().unwrap())?);
    let forwarder = Forwarder::new(
        transport,
        resolver.clone(),
        ForwardConfig::new("127.0.0.1", 5060),
    );

    let gateway = Arc::new(DestEntry::new(
        "127.0.0.1",
        next_hop.port(),
        resolver.as_ref(),
    )?);

    let mut routes = RouteTable::new();
    routes.set(
        0,
        vec![
            Action::Log(2, "relaying INVITE".to_string()),
            Action::SetHost("gw.example.net".to_string()),
            Action::Forward(ForwardDest::Proxy(gateway)),
            Action::Drop,
        ],
    )?;

    let mut modules = ModuleRegistry::new();
    modules.register(Module::new("demo").with_on_break(Arc::new(|msg: &SipMsg| {
        println!("on-break: finished with {}", msg.effective_uri());
    })));

    let engine = Interpreter::new(Arc::new(routes), Arc::new(modules), resolver, forwarder);

    let mut msg = demo_message();
    let outcome = engine.execute_route(0, &mut msg);
    println!("route outcome: {outcome}");

    let mut buf = [0u8; 2048];
    let (len, from) = receiver.recv_from(&mut buf)?;
    println!(
        "next hop received {len} bytes from {from}:\n{}",
        String::from_utf8_lossy(&buf[..len])
    );
    Ok(())
}

/// A canned INVITE with the Via view an upstream parser would provide.
fn demo_message() -> SipMsg {
    let raw = "INVITE sip:bob@example.com SIP/2.0\r\n\
               Via: SIP/2.0/UDP 127.0.0.1:5060\r\n\
               Content-Length: 0\r\n\r\n";
    let via_start = raw.find("Via:").unwrap();
    let via_end = raw[via_start..].find("\r\n").unwrap() + via_start + 2;

    let mut msg = SipMsg::new(
        raw.as_bytes().to_vec(),
        "sip:bob@example.com",
        "127.0.0.1:5060".parse().unwrap(),
    );
    msg.via1 = Some(ViaInfo {
        host: "127.0.0.1".to_string(),
        port: Some(5060),
        hdr_start: via_start,
        hdr_len: via_end - via_start,
        name_len: 3,
        host_end: via_end - 2,
        params_start: None,
        folded_next: false,
    });
    msg
}
