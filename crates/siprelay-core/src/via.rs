//! Byte-accurate view of a parsed Via header.
//!
//! The full SIP grammar lives in the message parser that produces these
//! views; the forwarding engine only needs the decoded hop address plus
//! enough offsets into the original wire buffer to splice a Via in or out
//! without re-serializing the message.

use serde::{Deserialize, Serialize};

/// One Via header as seen by the forwarding engine.
///
/// All offsets index into the message's original wire buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaInfo {
    /// Host the sender declared
    pub host: String,
    /// Port the sender declared, if any
    pub port: Option<u16>,
    /// Offset of the header-name token
    pub hdr_start: usize,
    /// Declared size of the header span, through its trailing delimiter
    pub hdr_len: usize,
    /// Length of the header-name token (`Via` or `v`)
    pub name_len: usize,
    /// Offset one past `host[:port]`
    pub host_end: usize,
    /// Offset of the `;` starting the Via parameters, when present
    pub params_start: Option<usize>,
    /// Another Via value follows in the same header (comma folding)
    pub folded_next: bool,
}

impl ViaInfo {
    /// Byte span to strip when removing this Via from a reply.
    ///
    /// With a folded continuation the header-name token and its `:` stay in
    /// place so the next value keeps its name; only the value is stripped.
    pub fn removal_span(&self) -> (usize, usize) {
        if self.folded_next {
            let keep = self.name_len + 1;
            (self.hdr_start + keep, self.hdr_len - keep)
        } else {
            (self.hdr_start, self.hdr_len)
        }
    }

    /// Offset where a `received` parameter splices in: right before the
    /// existing parameters, or after `host[:port]` when there are none.
    pub fn received_insert_at(&self) -> usize {
        self.params_start.unwrap_or(self.host_end)
    }

    /// Offset one past the end of the header span.
    pub fn end(&self) -> usize {
        self.hdr_start + self.hdr_len
    }
}
