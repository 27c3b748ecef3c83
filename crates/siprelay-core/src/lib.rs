//! Core message model for the siprelay proxy.
//!
//! This crate carries the types the routing and forwarding engine acts on:
//!
//! - [`SipMsg`]: the consumed view of one inbound message — original wire
//!   bytes, Request-URI (plus an optional replacement), parsed Via views and
//!   packet source
//! - [`Uri`]: a compact SIP URI with byte-faithful recomposition and the
//!   component-rewrite operations route scripts use
//! - [`ViaInfo`]: offsets into the wire buffer that let the forwarder splice
//!   Via headers in and out without re-serializing
//! - [`Error`]: the crate error taxonomy, each kind mapped onto the signed
//!   outcome codes the action interpreter reports

pub mod error;
pub mod msg;
pub mod uri;
pub mod via;

pub use error::{Error, Result};
pub use msg::{SipMsg, SIP_PORT};
pub use uri::{rewrite_part, Uri, UriPart, MAX_URI_SIZE};
pub use via::ViaInfo;
