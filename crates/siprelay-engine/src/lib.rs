//! Decision-and-forwarding core of a SIP signaling proxy.
//!
//! Two pieces work together here:
//!
//! - the [`Interpreter`], which executes a compiled route script (an ordered
//!   [`Action`] sequence) against one inbound [`SipMsg`] — rewriting its
//!   Request-URI, branching on expressions, recursing into named routes and
//!   handing the message to the forwarder
//! - the [`Forwarder`], which statelessly retransmits the message: Via
//!   insertion plus `received` bookkeeping on the request path, Via removal
//!   on the reply path, with per-destination failover in [`DestEntry`]
//!
//! Everything else — SIP grammar parsing, expression evaluation, module
//! capabilities, name resolution, the receive loop — is a collaborator that
//! plugs in through the traits in this crate.
//!
//! Execution is single-threaded and blocking per worker: one message runs to
//! completion, resolver calls stall the worker, and the only early exit from
//! a route script is the explicit stop outcome.

pub mod action;
pub mod config;
pub mod dest;
pub mod forward;
pub mod interpreter;
pub mod logging;
pub mod modules;
pub mod resolve;
pub mod splice;
pub mod transport;

pub use action::{
    Action, ActionSeq, CommandFn, Condition, ForwardDest, Outcome, PortSpec, RouteTable,
    CONTINUE, EXPR_DROP, ROUTE_TABLE_SIZE, STOP,
};
pub use config::ForwardConfig;
pub use dest::{DestEntry, DestStats};
pub use forward::{Forwarder, MAX_RECEIVED, MAX_VIA_LINE};
pub use interpreter::{Interpreter, MAX_ROUTE_RECURSION};
pub use logging::{parse_log_level, setup_logging, LoggingConfig};
pub use modules::{Module, ModuleRegistry, OnBreakFn};
pub use resolve::{addresses_match, MatchMode, Resolve, ReverseEntry, SystemResolver};
pub use transport::{Transport, UdpTransport, MAX_UDP_PACKET_SIZE};

pub use siprelay_core::{Error, Result, SipMsg, Uri, UriPart, ViaInfo, MAX_URI_SIZE, SIP_PORT};
