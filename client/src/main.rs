//! The tfs client binary.
//!
//! Usage: `tfs-client <server-socket> [script-file]`. Reads commands, one
//! per line, from the script file (or standard input), skipping blank lines
//! and `#` comments, and sends each to the server in order. Exits non-zero
//! if any command was rejected.

use std::{env, fs, io, path::Path, process::ExitCode};

use log::{info, warn};
use tfs_client::Connection;
use tfs_proto::Command;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(server) = args.next() else {
        eprintln!("usage: tfs-client <server-socket> [script-file]");
        return ExitCode::FAILURE;
    };
    let script = args.next();
    if args.next().is_some() {
        eprintln!("usage: tfs-client <server-socket> [script-file]");
        return ExitCode::FAILURE;
    }

    let input = match &script {
        Some(path) => fs::read_to_string(path),
        None => io::read_to_string(io::stdin()),
    };
    let input = match input {
        Ok(input) => input,
        Err(err) => {
            eprintln!("unable to read commands: {err}");
            return ExitCode::FAILURE;
        }
    };

    let connection = match Connection::new(Path::new(&server)) {
        Ok(connection) => connection,
        Err(err) => {
            eprintln!("unable to connect to `{server}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut failures = 0_usize;
    for (line_idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: Command = match line.parse() {
            Ok(command) => command,
            Err(err) => {
                warn!("line {}: {err}", line_idx + 1);
                failures += 1;
                continue;
            }
        };
        match connection.send(&command) {
            Ok(true) => info!("line {}: ok: {command}", line_idx + 1),
            Ok(false) => {
                warn!("line {}: server rejected: {command}", line_idx + 1);
                failures += 1;
            }
            Err(err) => {
                eprintln!("line {}: {err}", line_idx + 1);
                return ExitCode::FAILURE;
            }
        }
    }

    if failures > 0 {
        warn!("{failures} commands failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
