//! Compiled route-script representation.
//!
//! A route script arrives here already compiled: an ordered sequence of
//! [`Action`] values, at most one sequence per route-table slot. The enum
//! replaces the classic three-operand node with one typed variant per action,
//! so an operand of the wrong kind cannot be expressed at all.

use std::fmt;
use std::sync::Arc;

use siprelay_core::{Error, Result, SipMsg};

use crate::dest::DestEntry;

/// Signed outcome of one action or one action sequence.
///
/// `0` stops the current sequence. A positive value continues to the next
/// action. A negative value is an error code that is recorded but does not
/// stop the sequence — only `0` does.
pub type Outcome = i32;

/// Keep walking the sequence.
pub const CONTINUE: Outcome = 1;

/// Stop the current sequence.
pub const STOP: Outcome = 0;

/// Reserved evaluator result meaning "abort processing".
pub const EXPR_DROP: i32 = -127;

/// Condition evaluated by [`Action::If`].
///
/// The external expression evaluator plugs in through this trait. Any
/// negative result other than [`EXPR_DROP`] is a soft evaluation failure.
pub trait Condition: Send + Sync {
    fn eval(&self, msg: &SipMsg) -> i32;
}

impl<F> Condition for F
where
    F: Fn(&SipMsg) -> i32 + Send + Sync,
{
    fn eval(&self, msg: &SipMsg) -> i32 {
        self(msg)
    }
}

/// Module command invoked by [`Action::ModuleCall`].
///
/// The two string parameters are opaque to the interpreter; the return value
/// is propagated verbatim as the action outcome.
pub type CommandFn = Arc<dyn Fn(&mut SipMsg, &str, &str) -> Outcome + Send + Sync>;

/// Port selection for a Request-URI forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSpec {
    /// Take the port from the URI itself (5060 when absent)
    FromUri,
    /// Explicit override from the route script (0 also means 5060)
    Explicit(u16),
}

/// Where a `Forward` action sends the message.
#[derive(Clone)]
pub enum ForwardDest {
    /// Re-resolve the current Request-URI into a temporary destination
    RequestUri { port: PortSpec },
    /// Use an already-resolved, long-lived destination
    Proxy(Arc<DestEntry>),
}

/// One step of a compiled route script.
#[derive(Clone)]
pub enum Action {
    /// Stop processing this sequence
    Drop,
    /// Rewrite the message (new Via) and relay it toward a destination
    Forward(ForwardDest),
    /// Transmit the raw bytes unchanged to a destination
    Send(Arc<DestEntry>),
    /// Emit a log line at the given severity
    Log(i32, String),
    /// Structured error reporting; still a stub
    Error,
    /// Recurse into the numbered route
    Route(usize),
    /// Run an external command line
    Exec(String),
    /// Replace the host component of the Request-URI
    SetHost(String),
    /// Replace the `host[:port]` chunk of the Request-URI
    SetHostPort(String),
    /// Replace the user component of the Request-URI
    SetUser(String),
    /// Replace the `user[:password]` chunk of the Request-URI
    SetUserPass(String),
    /// Replace the port component of the Request-URI
    SetPort(String),
    /// Replace the whole Request-URI verbatim
    SetUri(String),
    /// Conditional branch
    If {
        cond: Arc<dyn Condition>,
        then_actions: Option<ActionSeq>,
        else_actions: Option<ActionSeq>,
    },
    /// Invoke a registered module command
    ModuleCall {
        command: CommandFn,
        param1: String,
        param2: String,
    },
}

/// Ordered action sequence; executed front to back.
pub type ActionSeq = Vec<Action>;

impl Action {
    /// Name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Drop => "drop",
            Action::Forward(_) => "forward",
            Action::Send(_) => "send",
            Action::Log(..) => "log",
            Action::Error => "error",
            Action::Route(_) => "route",
            Action::Exec(_) => "exec",
            Action::SetHost(_) => "sethost",
            Action::SetHostPort(_) => "sethostport",
            Action::SetUser(_) => "setuser",
            Action::SetUserPass(_) => "setuserpass",
            Action::SetPort(_) => "setport",
            Action::SetUri(_) => "seturi",
            Action::If { .. } => "if",
            Action::ModuleCall { .. } => "modulecall",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Log(level, text) => write!(f, "log({level}, {text:?})"),
            Action::Route(index) => write!(f, "route({index})"),
            Action::Exec(cmd) => write!(f, "exec({cmd:?})"),
            Action::Forward(ForwardDest::Proxy(entry)) => write!(f, "forward({})", entry.name()),
            Action::Forward(ForwardDest::RequestUri { port }) => write!(f, "forward(uri, {port:?})"),
            Action::Send(entry) => write!(f, "send({})", entry.name()),
            Action::SetHost(v)
            | Action::SetHostPort(v)
            | Action::SetUser(v)
            | Action::SetUserPass(v)
            | Action::SetPort(v)
            | Action::SetUri(v) => write!(f, "{}({v:?})", self.kind()),
            _ => f.write_str(self.kind()),
        }
    }
}

/// Number of route slots in a [`RouteTable`].
pub const ROUTE_TABLE_SIZE: usize = 32;

/// Fixed-size table mapping a route number to its action sequence.
///
/// Filled once at startup by the route compiler; read-only afterwards.
pub struct RouteTable {
    slots: Vec<ActionSeq>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable {
            slots: vec![Vec::new(); ROUTE_TABLE_SIZE],
        }
    }

    /// Install the action sequence for a route number.
    pub fn set(&mut self, index: usize, actions: ActionSeq) -> Result<()> {
        if index >= ROUTE_TABLE_SIZE {
            return Err(Error::config(format!(
                "route {index} outside table of {ROUTE_TABLE_SIZE}"
            )));
        }
        self.slots[index] = actions;
        Ok(())
    }

    /// Sequence for a route number; `None` when the index is out of range.
    pub fn get(&self, index: usize) -> Option<&ActionSeq> {
        self.slots.get(index)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
