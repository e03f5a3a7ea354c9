//! Lint validator service.
//!
//! Same transport as the evaluator: newline-terminated JSON requests on
//! stdin, one JSON reply per request on stdout, sentinel pair after each.
//! Each request is a JSON object `{code, globals, options}` and is checked
//! statelessly.

pub mod check;
pub mod issue;

pub use check::{validate, LintReply, LintRequest};
pub use issue::{LintCode, LintIssue, Severity};

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::protocol::{write_diagnostic, write_sentinel_pair};
use crate::session::LineFramer;

/// Drive the validator from a reader until end of input.
pub fn run<R: Read, O: Write, E: Write>(
    mut input: R,
    out: &mut O,
    err: &mut E,
) -> std::io::Result<()> {
    let mut framer = LineFramer::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = input.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        framer.push(&chunk[..n]);
        while let Some(line) = framer.next_line() {
            handle_line(&line, out, err)?;
        }
    }
}

fn handle_line<O: Write, E: Write>(
    line: &[u8],
    out: &mut O,
    err: &mut E,
) -> std::io::Result<()> {
    match serde_json::from_slice::<LintRequest>(line) {
        Ok(request) => {
            debug!(bytes = line.len(), "lint request");
            let reply = validate(&request);
            serde_json::to_writer(&mut *out, &reply)?;
            out.write_all(b"\n")?;
        }
        Err(fault) => {
            warn!(%fault, "malformed lint request");
            write_diagnostic(err, &format!("malformed lint request: {}", fault))?;
        }
    }
    write_sentinel_pair(out, err)
}
