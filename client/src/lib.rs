//! Client library for talking to a tfs server.

use std::{
    env, fs, io,
    os::unix::net::UnixDatagram,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

use tfs_proto::{Command, RESPONSE_OK};

/// Error of [`Connection`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("unable to bind client socket")]
    Bind(#[source] io::Error),
    #[error("unable to reach server socket")]
    Connect(#[source] io::Error),
    #[error("unable to send command")]
    Send(#[source] io::Error),
    #[error("unable to receive response")]
    Receive(#[source] io::Error),
}

/// A connection to a tfs server over a pair of unix datagram sockets.
///
/// Binds a client socket under the system temporary directory, unique per
/// process and per connection; the socket file is unlinked again on drop.
pub struct Connection {
    socket: UnixDatagram,
    socket_path: PathBuf,
}

impl Connection {
    pub fn new(server: &Path) -> Result<Self, ConnectionError> {
        static SEQ: AtomicUsize = AtomicUsize::new(0);

        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let socket_path =
            env::temp_dir().join(format!("tfs-client-{}-{seq}", process::id()));
        let _ = fs::remove_file(&socket_path);
        let socket = UnixDatagram::bind(&socket_path).map_err(ConnectionError::Bind)?;
        socket.connect(server).map_err(ConnectionError::Connect)?;
        Ok(Self { socket, socket_path })
    }

    /// Sends one command and reads the one-byte response.
    ///
    /// Returns whether the server executed the command successfully.
    pub fn send(&self, command: &Command) -> Result<bool, ConnectionError> {
        let mut request = command.to_string().into_bytes();
        // A NUL terminates the request on the wire.
        request.push(0);
        self.socket.send(&request).map_err(ConnectionError::Send)?;

        let mut response = [0_u8; 1];
        let len = self
            .socket
            .recv(&mut response)
            .map_err(ConnectionError::Receive)?;
        Ok(len == 1 && response[0] == RESPONSE_OK)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.socket_path);
    }
}
