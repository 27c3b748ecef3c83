//! Route-script execution.
//!
//! The interpreter walks an action sequence in order, dispatching each
//! action against the in-flight message. Only the `0` outcome stops a
//! sequence; errors are recorded as negative outcomes and the walk keeps
//! going. Nested invocations (`route`, `if` branches) carry an explicit
//! depth argument bounded by [`MAX_ROUTE_RECURSION`].

use std::process::Command;
use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use siprelay_core::uri;
use siprelay_core::{Error, SipMsg, Uri, UriPart};

use crate::action::{
    Action, ForwardDest, Outcome, PortSpec, RouteTable, CONTINUE, EXPR_DROP, STOP,
};
use crate::dest::DestEntry;
use crate::forward::Forwarder;
use crate::modules::ModuleRegistry;
use crate::resolve::Resolve;

/// Maximum nesting of action-sequence invocations per message.
pub const MAX_ROUTE_RECURSION: usize = 16;

/// Executes compiled route scripts against inbound messages.
pub struct Interpreter {
    routes: Arc<RouteTable>,
    modules: Arc<ModuleRegistry>,
    resolver: Arc<dyn Resolve>,
    forwarder: Forwarder,
}

impl Interpreter {
    pub fn new(
        routes: Arc<RouteTable>,
        modules: Arc<ModuleRegistry>,
        resolver: Arc<dyn Resolve>,
        forwarder: Forwarder,
    ) -> Self {
        Interpreter {
            routes,
            modules,
            resolver,
            forwarder,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Run one action sequence to completion.
    ///
    /// This is the entry point a dispatch loop calls once per inbound
    /// message. When the run ends in an explicit stop, every registered
    /// on-break hook fires, in registration order.
    pub fn execute_sequence(&self, actions: &[Action], msg: &mut SipMsg) -> Outcome {
        let ret = self.run_sequence(actions, msg, 0);
        if ret == STOP {
            self.modules.notify_break(msg);
        }
        ret
    }

    /// Run the numbered route from the table.
    pub fn execute_route(&self, index: usize, msg: &mut SipMsg) -> Outcome {
        match self.routes.get(index) {
            Some(actions) => self.execute_sequence(actions, msg),
            None => {
                error!("route {} out of range", index);
                Error::config(format!("route {index} out of range")).code()
            }
        }
    }

    fn run_sequence(&self, actions: &[Action], msg: &mut SipMsg, depth: usize) -> Outcome {
        let depth = depth + 1;
        if depth > MAX_ROUTE_RECURSION {
            error!(
                "action sequences nested deeper than {}, aborting this invocation",
                MAX_ROUTE_RECURSION
            );
            return Error::unspecified("route recursion limit exceeded").code();
        }
        if actions.is_empty() {
            warn!("empty action sequence");
            return CONTINUE;
        }

        let mut ret = CONTINUE;
        for action in actions {
            ret = self.execute_action(action, msg, depth);
            if ret == STOP {
                trace!("sequence stopped at {}", action.kind());
                break;
            }
            if ret < 0 {
                // errors are recorded but do not stop the sequence
                debug!("action {} failed with {}, continuing", action.kind(), ret);
            }
        }
        ret
    }

    fn execute_action(&self, action: &Action, msg: &mut SipMsg, depth: usize) -> Outcome {
        match action {
            Action::Drop => STOP,

            Action::Forward(dest) => self.do_forward(dest, msg),

            Action::Send(entry) => match self.forwarder.send_raw(msg, entry) {
                Ok(()) => CONTINUE,
                Err(e) => e.code(),
            },

            Action::Log(level, text) => {
                log_at(*level, text);
                CONTINUE
            }

            Action::Error => {
                warn!("error action is not implemented, continuing");
                CONTINUE
            }

            Action::Route(index) => match self.routes.get(*index) {
                Some(actions) => {
                    let ret = self.run_sequence(actions, msg, depth);
                    // a failed nested route keeps the outer sequence moving
                    if ret < 0 {
                        CONTINUE
                    } else {
                        ret
                    }
                }
                None => {
                    error!("route {} out of range", index);
                    Error::config(format!("route {index} out of range")).code()
                }
            },

            Action::Exec(cmd) => {
                match Command::new("sh").arg("-c").arg(cmd).status() {
                    Ok(status) if status.success() => {}
                    Ok(status) => warn!("exec {:?} exited with {}", cmd, status),
                    Err(e) => warn!("exec {:?} failed to start: {}", cmd, e),
                }
                CONTINUE
            }

            Action::SetHost(value) => self.rewrite_uri(msg, UriPart::Host, value),
            Action::SetHostPort(value) => self.rewrite_uri(msg, UriPart::HostPort, value),
            Action::SetUser(value) => self.rewrite_uri(msg, UriPart::User, value),
            Action::SetUserPass(value) => self.rewrite_uri(msg, UriPart::UserPass, value),
            Action::SetPort(value) => self.rewrite_uri(msg, UriPart::Port, value),

            Action::SetUri(value) => {
                msg.set_new_uri(value.clone());
                CONTINUE
            }

            Action::If {
                cond,
                then_actions,
                else_actions,
            } => {
                let value = cond.eval(msg);
                if value == EXPR_DROP {
                    trace!("expression requested drop");
                    return STOP;
                }
                if value < 0 {
                    warn!("error in expression evaluation ({}), continuing", value);
                }
                if value > 0 {
                    match then_actions {
                        Some(actions) => self.run_sequence(actions, msg, depth),
                        None => CONTINUE,
                    }
                } else {
                    match else_actions {
                        Some(actions) => self.run_sequence(actions, msg, depth),
                        None => CONTINUE,
                    }
                }
            }

            Action::ModuleCall {
                command,
                param1,
                param2,
            } => (command.as_ref())(msg, param1, param2),
        }
    }

    fn do_forward(&self, dest: &ForwardDest, msg: &SipMsg) -> Outcome {
        match dest {
            ForwardDest::Proxy(entry) => match self.forwarder.forward_request(msg, entry) {
                Ok(()) => CONTINUE,
                Err(e) => {
                    warn!("forward to {} failed: {}", entry.name(), e);
                    e.code()
                }
            },
            ForwardDest::RequestUri { port } => {
                let target = msg.effective_uri();
                let parsed = match Uri::parse(target) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("cannot parse Request-URI {:?}: {}", target, e);
                        return e.code();
                    }
                };
                let port = match port {
                    PortSpec::Explicit(p) => *p,
                    PortSpec::FromUri => parsed.port.unwrap_or(0),
                };
                // temporary entry, dropped right after the send
                let entry = match DestEntry::new(parsed.host.as_str(), port, self.resolver.as_ref()) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("cannot resolve {}: {}", parsed.host, e);
                        return e.code();
                    }
                };
                match self.forwarder.forward_request(msg, &entry) {
                    Ok(()) => CONTINUE,
                    Err(e) => e.code(),
                }
            }
        }
    }

    fn rewrite_uri(&self, msg: &mut SipMsg, part: UriPart, value: &str) -> Outcome {
        let current = msg.effective_uri();
        match uri::rewrite_part(current, part, value) {
            Ok(new_uri) => {
                trace!("Request-URI rewritten to {}", new_uri);
                msg.set_new_uri(new_uri);
                CONTINUE
            }
            Err(e) => {
                warn!("Request-URI rewrite failed: {}", e);
                e.code()
            }
        }
    }
}

/// Map a numeric route-script severity onto tracing levels.
fn log_at(level: i32, text: &str) {
    match level {
        i32::MIN..=0 => error!("{}", text),
        1 => warn!("{}", text),
        2 => info!("{}", text),
        3 => debug!("{}", text),
        _ => trace!("{}", text),
    }
}
