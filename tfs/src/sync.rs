//! Synchronization primitives.

pub use self::rw_lock::{Access, RwLock};

mod rw_lock;
