//! The tfs server binary.
//!
//! Usage: `tfs-server <num-workers> <socket-path>`. Binds a unix datagram
//! socket, receives one command per datagram, and executes them on a pool
//! of worker threads. Each request is answered with a single byte: `0x01`
//! on success, `0x00` on failure.

use std::{env, fs, io, os::unix::net::UnixDatagram, process::ExitCode, sync::Arc, thread};

use log::info;
use tfs::Fs;
use tfs_server::{queue::Queue, worker};

/// Commands buffered between the receiver and the workers.
const QUEUE_CAPACITY: usize = 64;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(num_workers), Some(socket_path), None) = (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: tfs-server <num-workers> <socket-path>");
        return ExitCode::FAILURE;
    };
    let num_workers: usize = match num_workers.parse() {
        Ok(n) if n > 0 => n,
        _ => {
            eprintln!("unable to parse number of workers");
            return ExitCode::FAILURE;
        }
    };

    match serve(num_workers, &socket_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("server error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn serve(num_workers: usize, socket_path: &str) -> io::Result<()> {
    // Remove any stale socket left over from a previous run.
    let _ = fs::remove_file(socket_path);
    let socket = UnixDatagram::bind(socket_path)?;
    info!("listening on `{socket_path}` with {num_workers} workers");

    let fs = Arc::new(Fs::new());
    let queue = Arc::new(Queue::new(QUEUE_CAPACITY));

    for n in 0..num_workers {
        let fs = Arc::clone(&fs);
        let queue = Arc::clone(&queue);
        let socket = socket.try_clone()?;
        thread::Builder::new()
            .name(format!("worker-{n}"))
            .spawn(move || worker::run(&fs, &queue, &socket))?;
    }

    tfs_server::receive_loop(&socket, &queue)
}
