//! The tfs server: a datagram socket loop feeding a worker pool.
//!
//! The main thread receives one command per datagram, parses it, and pushes
//! it onto a bounded [`queue::Queue`]; worker threads pop commands, execute
//! them against a shared [`tfs::Fs`], and answer each client with a single
//! response byte.

use std::{io, os::unix::net::UnixDatagram};

use log::warn;
use tfs_proto::{Command, MAX_REQUEST_LEN};

use self::{queue::Queue, worker::Job};

pub mod queue;
pub mod worker;

/// Receives datagrams and feeds the queue, until the socket fails or the
/// queue is closed. Unparseable requests are answered `0x00` on the spot.
pub fn receive_loop(socket: &UnixDatagram, queue: &Queue<Job>) -> io::Result<()> {
    let mut buf = [0_u8; MAX_REQUEST_LEN];
    loop {
        let (len, reply_to) = socket.recv_from(&mut buf)?;
        let request = &buf[..len];
        // A NUL terminates the request on the wire.
        let request = match request.iter().position(|&b| b == 0) {
            Some(pos) => &request[..pos],
            None => request,
        };
        let line = String::from_utf8_lossy(request);
        match line.parse::<Command>() {
            Ok(command) => {
                if queue.push(Job { command, reply_to }).is_err() {
                    return Ok(());
                }
            }
            Err(err) => {
                warn!("unable to parse command {line:?}: {err}");
                worker::respond(socket, &reply_to, false);
            }
        }
    }
}
