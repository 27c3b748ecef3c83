//! Wire-buffer splicing.
//!
//! Forwarding never edits a message in place. An output buffer is described
//! as an ordered list of copy ranges over the original bytes and literal
//! insertions, then materialized by one bounds-checked pass.

use std::ops::Range;

use siprelay_core::{Error, Result};

/// One step of an output-buffer description.
#[derive(Debug, Clone)]
pub enum Splice<'a> {
    /// Copy this range of the input
    Copy(Range<usize>),
    /// Insert these bytes literally
    Insert(&'a [u8]),
}

/// Materialize `ops` over `input` into one owned buffer.
///
/// An out-of-bounds range is a defect in the caller's offset arithmetic, not
/// a runtime condition, and is reported as such.
pub fn materialize(input: &[u8], ops: &[Splice<'_>]) -> Result<Vec<u8>> {
    let mut total = 0usize;
    for op in ops {
        match op {
            Splice::Copy(range) => {
                if range.start > range.end || range.end > input.len() {
                    return Err(Error::bug(format!(
                        "splice range {range:?} outside input of {} bytes",
                        input.len()
                    )));
                }
                total += range.end - range.start;
            }
            Splice::Insert(bytes) => total += bytes.len(),
        }
    }

    let mut out = Vec::with_capacity(total);
    for op in ops {
        match op {
            Splice::Copy(range) => out.extend_from_slice(&input[range.clone()]),
            Splice::Insert(bytes) => out.extend_from_slice(bytes),
        }
    }
    Ok(out)
}
