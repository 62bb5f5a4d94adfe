//! The inode table.

use std::sync::{Mutex, MutexGuard};

use tfs_types::InodeType;

use super::{Inode, InodeData, InodeIdx};

const INITIAL_CAPACITY: usize = 4;

/// Error of the fallible [`InodeTable`] operations. Never surfaced to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid inode index {0}")]
pub(crate) struct InvalidIdx(pub(crate) InodeIdx);

/// A growable, index-stable collection of inode slots.
///
/// Slots are heap-boxed so their addresses survive growth of the backing
/// vector: an [`InodeIdx`] (and any payload borrow taken through it) stays
/// valid while other threads allocate. Occupancy is tracked in a separate
/// list so allocation never has to look at a payload it does not own; the
/// list and the payload tag of every slot change together, under `slots`.
pub(crate) struct InodeTable {
    slots: Mutex<Slots>,
}

struct Slots {
    inodes: Vec<Box<Inode>>,
    live: Vec<bool>,
}

impl InodeTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                inodes: Vec::new(),
                live: Vec::new(),
            }),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().expect("inode table mutex poisoned")
    }

    /// Allocates a fresh inode of type `ty`.
    ///
    /// Reuses the first free slot, or doubles the table (starting at
    /// [`INITIAL_CAPACITY`]) when none is left. Existing indices remain
    /// valid across the growth.
    pub(crate) fn create(&self, ty: InodeType) -> InodeIdx {
        let mut slots = self.slots();
        let idx = match slots.live.iter().position(|live| !live) {
            Some(idx) => idx,
            None => {
                let idx = slots.inodes.len();
                let new_len = if idx == 0 { INITIAL_CAPACITY } else { idx * 2 };
                slots.inodes.resize_with(new_len, || Box::new(Inode::empty()));
                slots.live.resize(new_len, false);
                idx
            }
        };
        slots.live[idx] = true;
        // The slot is free: nothing else may touch its payload.
        unsafe { *slots.inodes[idx].data_ptr() = Some(InodeData::new(ty)) };
        InodeIdx::new(idx)
    }

    /// Frees the slot at `idx`, destroying its payload.
    ///
    /// The caller must hold the inode's lock in `Unique` mode, or the inode
    /// must not be reachable from any directory.
    pub(crate) fn remove(&self, idx: InodeIdx) -> Result<(), InvalidIdx> {
        let mut slots = self.slots();
        match slots.live.get(idx.get()) {
            Some(true) => {}
            Some(false) | None => return Err(InvalidIdx(idx)),
        }
        slots.live[idx.get()] = false;
        unsafe { *slots.inodes[idx.get()].data_ptr() = None };
        Ok(())
    }

    /// Returns the slot at `idx`, if the table is large enough.
    ///
    /// The reference stays valid after the internal mutex is released: slot
    /// boxes are never dropped or moved until the table itself drops.
    pub(crate) fn slot(&self, idx: InodeIdx) -> Option<&Inode> {
        let slots = self.slots();
        let inode = slots.inodes.get(idx.get())?;
        let ptr: *const Inode = &**inode;
        Some(unsafe { &*ptr })
    }

    /// Number of slots, free or live.
    pub(crate) fn capacity(&self) -> usize {
        self.slots().inodes.len()
    }

    /// Number of live inodes.
    pub(crate) fn live_count(&self) -> usize {
        self.slots().live.iter().filter(|live| **live).count()
    }
}
