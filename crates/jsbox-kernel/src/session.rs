//! Session loop: input framing, message dispatch, response cycles.
//!
//! A session consumes a byte stream of newline-terminated messages, each a
//! JSON string holding expression source. Every complete line is processed
//! as soon as it arrives, regardless of how the bytes were chunked, so any
//! split of the input stream yields the same logical message sequence.

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::interpreter::{NoConsole, ObjectRef, Value};
use crate::interpreter::value::{Builtin, CircularStructure};
use crate::protocol::{write_diagnostic, write_response, write_sentinel_pair, PrefixedConsole};
use crate::sandbox::{self, SandboxError};

/// Splits a byte stream into newline-terminated lines. Bytes after the last
/// newline stay buffered until more input arrives; they are dropped if the
/// stream ends first.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw input bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        Some(line)
    }
}

/// Anything that stops a message from producing a result value. Rendered as
/// a single diagnostic line on the error channel.
#[derive(Debug, Error)]
pub enum SessionFault {
    #[error("message is not valid utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed message: {0}")]
    Frame(#[from] serde_json::Error),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("result is not serializable: {0}")]
    Result(#[from] CircularStructure),
}

/// Session policy: how the binding environment relates to the message
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    /// Every message evaluates in a fresh environment.
    Stateless,
    /// The next message's result becomes the persistent environment.
    AwaitingContext,
    /// Later messages share the bound environment. Terminal state.
    Bound,
}

/// A request/response evaluation session over a pair of output channels.
pub struct Session {
    framer: LineFramer,
    policy: Policy,
    env: ObjectRef,
    console_enabled: bool,
}

impl Session {
    /// Stateless session: every message evaluates independently. The
    /// console capability is bound when `console_enabled` is set.
    pub fn stateless(console_enabled: bool) -> Self {
        Self {
            framer: LineFramer::new(),
            policy: Policy::Stateless,
            env: Value::empty_object(),
            console_enabled,
        }
    }

    /// Context-carrying session: the first message's result becomes the
    /// binding environment for all later messages.
    pub fn context() -> Self {
        Self {
            framer: LineFramer::new(),
            policy: Policy::AwaitingContext,
            env: Value::empty_object(),
            console_enabled: false,
        }
    }

    /// Feed input bytes, processing every complete line before returning.
    pub fn feed<O: Write, E: Write>(
        &mut self,
        chunk: &[u8],
        out: &mut O,
        err: &mut E,
    ) -> std::io::Result<()> {
        self.framer.push(chunk);
        while let Some(line) = self.framer.next_line() {
            self.handle_line(&line, out, err)?;
        }
        Ok(())
    }

    /// Drive the session from a reader until end of input.
    pub fn run<R: Read, O: Write, E: Write>(
        &mut self,
        mut input: R,
        out: &mut O,
        err: &mut E,
    ) -> std::io::Result<()> {
        let mut chunk = [0u8; 8192];
        loop {
            let n = input.read(&mut chunk)?;
            if n == 0 {
                // trailing bytes without a newline are dropped
                return Ok(());
            }
            self.feed(&chunk[..n], out, err)?;
        }
    }

    fn handle_line<O: Write, E: Write>(
        &mut self,
        line: &[u8],
        out: &mut O,
        err: &mut E,
    ) -> std::io::Result<()> {
        if self.policy == Policy::AwaitingContext {
            return self.bind_context(line, err);
        }

        match self.evaluate_line(line, err) {
            Ok(value) => match value.to_wire() {
                Ok(wire) => write_response(out, &wire)?,
                Err(fault) => {
                    warn!(%fault, "result could not be serialized");
                    write_diagnostic(err, &SessionFault::from(fault).to_string())?;
                }
            },
            Err(fault) => {
                warn!(%fault, "message failed");
                write_diagnostic(err, &fault.to_string())?;
            }
        }
        write_sentinel_pair(out, err)
    }

    /// Handle the context-defining first message. It produces no response
    /// line and no sentinel; the session moves to Bound unconditionally so
    /// later request/response pairing stays deterministic.
    fn bind_context<E: Write>(&mut self, line: &[u8], err: &mut E) -> std::io::Result<()> {
        self.policy = Policy::Bound;
        match self.evaluate_line(line, err) {
            Ok(Value::Object(obj)) => {
                debug!("context bound");
                self.env = obj;
            }
            Ok(other) => {
                warn!(got = other.type_of(), "context expression did not produce an object");
                write_diagnostic(
                    err,
                    "context expression did not produce an object; binding an empty context",
                )?;
                self.env = Value::empty_object();
            }
            Err(fault) => {
                warn!(%fault, "context initialization failed");
                write_diagnostic(err, &fault.to_string())?;
                self.env = Value::empty_object();
            }
        }
        Ok(())
    }

    fn evaluate_line<E: Write>(
        &mut self,
        line: &[u8],
        err: &mut E,
    ) -> Result<Value, SessionFault> {
        let text = std::str::from_utf8(line)?;
        let source: String = serde_json::from_str(text)?;
        debug!(bytes = line.len(), "dispatching message");

        let env = match self.policy {
            Policy::Stateless => Value::empty_object(),
            Policy::AwaitingContext | Policy::Bound => self.env.clone(),
        };
        if self.console_enabled {
            bind_console(&env);
        }

        let value = if self.console_enabled {
            let mut console = PrefixedConsole::new(err);
            sandbox::run_in_scope(&source, &env, &mut console)?
        } else {
            sandbox::run_in_scope(&source, &env, &mut NoConsole)?
        };
        Ok(value)
    }
}

/// Install the `console` object with its `log` and `error` builtins.
fn bind_console(env: &ObjectRef) {
    let console = Value::empty_object();
    {
        let mut console = console.borrow_mut();
        console.insert("log".to_string(), Value::Builtin(Builtin::ConsoleLog));
        console.insert("error".to_string(), Value::Builtin(Builtin::ConsoleError));
    }
    env.borrow_mut()
        .insert("console".to_string(), Value::Object(console));
}
