//! An in-memory hierarchical namespace with fine-grained locking.
//!
//! The crate is built from a few cooperating pieces, leaves first:
//!
//! * [`sync`]: a reader/writer lock with an explicit acquisition mode and
//!   unmoded release, so locks can cross function boundaries.
//! * [`inode`]: the growable, index-stable table of inode slots and the
//!   file / directory payloads they carry. Every slot owns the lock that
//!   guards its payload.
//! * [`Fs`]: path resolution and the create / remove / find / move /
//!   print operations, built on hand-over-hand acquisition of the slot
//!   locks. Successful operations hand the caller a [`LockedInode`] whose
//!   lock is still held and is released when the guard drops.
//!
//! Nothing here spawns threads or touches the network; callers drive the
//! engine concurrently from however many workers they like.

mod error;
mod fs;
pub mod inode;
pub mod sync;

pub use self::{
    error::{CreateError, FindError, MoveError, PrintError, RemoveError},
    fs::{Fs, LockedInode},
};
