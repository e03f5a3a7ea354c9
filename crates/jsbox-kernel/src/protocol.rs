//! Wire protocol helpers: the completion sentinel, response framing, and
//! the console sink that routes evaluated output to the error channel.
//!
//! Responses are single-line JSON on the output channel. Every processed
//! message is terminated by a sentinel pair: the sentinel token on its own
//! line on BOTH channels, written after the response (if any) and after all
//! diagnostic and console output for that message.

use std::io::Write;

use crate::interpreter::Console;

use jsbox_types::Value as WireValue;

/// Completion sentinel. Emitted on both channels after each processed
/// message so a client reading two pipes can frame per-message output
/// without timeouts.
pub const SENTINEL: &str = "r1cepzbhUTxtykz5XTC4";

/// Write a result value as one line of JSON on the output channel.
pub fn write_response<W: Write>(out: &mut W, value: &WireValue) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")
}

/// Write the sentinel line to both channels and flush them, in output
/// then error order.
pub fn write_sentinel_pair<O: Write, E: Write>(out: &mut O, err: &mut E) -> std::io::Result<()> {
    out.write_all(SENTINEL.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;
    err.write_all(SENTINEL.as_bytes())?;
    err.write_all(b"\n")?;
    err.flush()
}

/// Write a one-line diagnostic on the error channel.
pub fn write_diagnostic<E: Write>(err: &mut E, message: &str) -> std::io::Result<()> {
    err.write_all(message.as_bytes())?;
    err.write_all(b"\n")
}

/// Console sink that prefixes every payload line and writes it to the
/// error channel. Writes are best-effort: a failing error channel must
/// not fault evaluation.
pub struct PrefixedConsole<'a, E: Write> {
    err: &'a mut E,
}

impl<'a, E: Write> PrefixedConsole<'a, E> {
    pub fn new(err: &'a mut E) -> Self {
        Self { err }
    }

    fn emit(&mut self, prefix: &str, message: &str) {
        // a payload containing newlines gets the prefix on every line
        for line in message.split('\n') {
            let _ = self.err.write_all(prefix.as_bytes());
            let _ = self.err.write_all(line.as_bytes());
            let _ = self.err.write_all(b"\n");
        }
    }
}

impl<E: Write> Console for PrefixedConsole<'_, E> {
    fn log(&mut self, message: &str) {
        self.emit("[log] ", message);
    }

    fn error(&mut self, message: &str) {
        self.emit("[err] ", message);
    }
}
