//! jsbox CLI entry point.
//!
//! Usage:
//!   jsbox                 # Stateless evaluator over stdio
//!   jsbox --context       # Context-carrying evaluator
//!   jsbox --console       # Stateless evaluator with the console capability
//!   jsbox validate        # Lint validator

use std::env;
use std::io;
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jsbox_kernel::{validator, Session};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => run_session(Session::stateless(false)),

        Some("--context") => run_session(Session::context()),

        Some("--console") => run_session(Session::stateless(true)),

        Some("validate") => {
            let stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            let mut stderr = io::stderr().lock();
            validator::run(stdin, &mut stdout, &mut stderr)?;
            Ok(ExitCode::SUCCESS)
        }

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("jsbox {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'jsbox --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_session(mut session: Session) -> Result<ExitCode> {
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    session.run(stdin, &mut stdout, &mut stderr)?;
    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!(
        r#"jsbox v{}

Line-delimited JSON request/response evaluation service for a sandboxed
ES5.1 expression subset. Each stdin line is a JSON string of expression
source; each response is one JSON line on stdout followed by the
completion sentinel on stdout and stderr.

Usage:
  jsbox                 Stateless evaluator (fresh scope per request)
  jsbox --context       First result becomes the persistent context object
  jsbox --console       Stateless evaluator with console.log/error bound
  jsbox validate        Lint validator ({{code, globals, options}} requests)

Options:
  -h, --help            Show this help
  -V, --version         Show version
"#,
        env!("CARGO_PKG_VERSION")
    );
}
