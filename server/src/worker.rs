//! Worker threads executing commands against the file system.

use std::os::unix::net::{SocketAddr, UnixDatagram};

use log::{info, warn};
use tfs::{Fs, sync::Access};
use tfs_proto::{Command, RESPONSE_ERR, RESPONSE_OK};

use crate::queue::Queue;

/// A parsed command plus the address of the client that sent it.
pub struct Job {
    pub command: Command,
    pub reply_to: SocketAddr,
}

/// Pops and executes jobs until the queue closes.
pub fn run(fs: &Fs, queue: &Queue<Job>, socket: &UnixDatagram) {
    while let Some(job) = queue.pop() {
        let ok = execute(fs, &job.command);
        respond(socket, &job.reply_to, ok);
    }
}

/// Executes one command, logging one line per outcome.
pub fn execute(fs: &Fs, command: &Command) -> bool {
    match command {
        Command::Create { path, ty } => match fs.create(path, *ty) {
            Ok(inode) => {
                info!("created {ty} `{}` (inode {})", path.display(), inode.idx());
                inode.unlock();
                true
            }
            Err(err) => {
                warn!(
                    "unable to create {ty} `{}`: {}",
                    path.display(),
                    error_chain(&err)
                );
                false
            }
        },
        Command::Search { path } => match fs.find(path, Access::Shared) {
            Ok(inode) => {
                info!("found {} `{}` (inode {})", inode.ty(), path.display(), inode.idx());
                inode.unlock();
                true
            }
            Err(err) => {
                warn!("unable to find `{}`: {}", path.display(), error_chain(&err));
                false
            }
        },
        Command::Remove { path } => match fs.remove(path) {
            Ok(()) => {
                info!("removed `{}`", path.display());
                true
            }
            Err(err) => {
                warn!("unable to remove `{}`: {}", path.display(), error_chain(&err));
                false
            }
        },
        Command::Move { source, dest } => match fs.mv(source, dest, Access::Unique) {
            Ok(inode) => {
                info!(
                    "moved {} `{}` (inode {}) to `{}`",
                    inode.ty(),
                    source.display(),
                    inode.idx(),
                    dest.display()
                );
                inode.unlock();
                true
            }
            Err(err) => {
                warn!(
                    "unable to move `{}` to `{}`: {}",
                    source.display(),
                    dest.display(),
                    error_chain(&err)
                );
                false
            }
        },
        Command::Print { file_name } => match fs.print(file_name) {
            Ok(()) => {
                info!("printed tree to `{file_name}`");
                true
            }
            Err(err) => {
                warn!("unable to print tree to `{file_name}`: {}", error_chain(&err));
                false
            }
        },
    }
}

/// Sends the one-byte response for a request back to its sender.
pub fn respond(socket: &UnixDatagram, addr: &SocketAddr, ok: bool) {
    let byte = [if ok { RESPONSE_OK } else { RESPONSE_ERR }];
    let Some(path) = addr.as_pathname() else {
        warn!("client socket has no path; dropping response");
        return;
    };
    if let Err(err) = socket.send_to(&byte, path) {
        warn!("unable to respond to `{}`: {err}", path.display());
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    use std::fmt::Write as _;

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        let _ = write!(message, ": {err}");
        source = err.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use tfs_types::{InodeType, PathBuf};

    use super::*;

    #[test]
    fn test_execute_reports_success_and_failure() {
        let fs = Fs::new();
        let create = Command::Create {
            path: PathBuf::from("/a"),
            ty: InodeType::Dir,
        };
        assert!(execute(&fs, &create));
        // The same create again collides on the entry name.
        assert!(!execute(&fs, &create));

        assert!(execute(&fs, &Command::Search { path: PathBuf::from("/a") }));
        assert!(execute(&fs, &Command::Remove { path: PathBuf::from("/a") }));
        assert!(!execute(&fs, &Command::Search { path: PathBuf::from("/a") }));
    }
}
