//! The file system engine.
//!
//! [`Fs`] maps slash-separated paths onto inodes and exposes the create /
//! remove / find / move / print operations workers execute. All
//! synchronization between concurrent operations goes through the
//! per-inode reader/writer locks:
//!
//! * Path resolution is *hand-over-hand*: a child's lock is acquired while
//!   its parent's is still held, so the entry that led to the child cannot
//!   be removed or renamed mid-descent. Intermediate directories are taken
//!   `Shared`; the final inode is taken with the access the caller asked
//!   for.
//! * Mutating operations hold `Unique` on every directory they modify and
//!   on the target inode.
//! * On success, operations return a [`LockedInode`]: the requested inode
//!   with its lock still held by the calling thread. The caller releases it
//!   exactly once, by dropping the guard (or calling
//!   [`LockedInode::unlock`], which reads better at call sites).
//!
//! `move` is the only operation that takes locks in two directions from a
//! common point. It keeps the common ancestor of the two paths locked
//! `Unique` for its whole duration, which serializes conflicting moves at
//! that ancestor; the descents to the two parent directories enter distinct
//! children of the ancestor and therefore never contend for the same locks.

use core::fmt;
use std::{fs, io, io::Write as _};

use tfs_types::{InodeType, Path};

use crate::{
    error::{CreateError, FindError, MoveError, PrintError, RemoveError},
    inode::{Dir, Inode, InodeData, InodeIdx, InodeTable},
    sync::Access,
};

/// The file system.
///
/// The inode at [`InodeIdx::ROOT`] is created at construction, is always a
/// directory, and cannot be removed.
pub struct Fs {
    table: InodeTable,
}

impl Fs {
    #[must_use]
    pub fn new() -> Self {
        let table = InodeTable::new();
        let root = table.create(InodeType::Dir);
        assert_eq!(root, InodeIdx::ROOT, "root must land at index 0");
        Self { table }
    }

    /// Resolves `path` and returns its inode locked with `access`.
    ///
    /// The empty path (or `/`) resolves to the root directory.
    pub fn find(&self, path: &Path, access: Access) -> Result<LockedInode<'_>, FindError> {
        self.find_locked(path, access)
    }

    /// Creates a new inode of type `ty` at `path`.
    ///
    /// On success the new inode is returned locked `Unique`.
    pub fn create(&self, path: &Path, ty: InodeType) -> Result<LockedInode<'_>, CreateError> {
        let (parent_path, name) = path.split_last();
        let mut parent = self
            .find_locked(parent_path, Access::Unique)
            .map_err(|source| CreateError::InexistentParentDir {
                parent: parent_path.to_path_buf(),
                source,
            })?;
        let Some(dir) = parent.as_dir_mut() else {
            return Err(CreateError::ParentNotDir {
                parent: parent_path.to_path_buf(),
            });
        };

        let idx = self.table.create(ty);
        if let Err(source) = dir.add_entry(idx, name) {
            self.table.remove(idx).expect("fresh inode is removable");
            return Err(CreateError::AddEntry(source));
        }

        // Lock the child before releasing the parent, so no other thread
        // can reach the new entry and remove it first.
        let child = self.lock_slot(idx, Access::Unique);
        drop(parent);
        Ok(child)
    }

    /// Removes the inode at `path`.
    ///
    /// Directories must be empty. No lock is held on return.
    pub fn remove(&self, path: &Path) -> Result<(), RemoveError> {
        let (parent_path, name) = path.split_last();
        let mut parent = self
            .find_locked(parent_path, Access::Unique)
            .map_err(|source| RemoveError::InexistentParentDir {
                parent: parent_path.to_path_buf(),
                source,
            })?;
        let Some(dir) = parent.as_dir() else {
            return Err(RemoveError::ParentNotDir {
                parent: parent_path.to_path_buf(),
            });
        };
        let Some(idx) = dir.search_by_name(name) else {
            return Err(RemoveError::NameNotFound {
                name: display_name(name),
            });
        };

        let target = self.lock_slot(idx, Access::Unique);
        if let Some(target_dir) = target.as_dir() {
            if !target_dir.is_empty() {
                return Err(RemoveError::RemoveNonEmptyDir {
                    name: display_name(name),
                });
            }
        }

        let removed = parent
            .as_dir_mut()
            .expect("parent is a directory")
            .remove_entry(idx);
        debug_assert!(removed);
        self.table.remove(idx).expect("target inode is live");
        // Dropping `target` releases the now-free slot's lock.
        Ok(())
    }

    /// Moves the inode at `source` to `dest`.
    ///
    /// On success the moved inode is returned locked with `access`. Fails if
    /// either path is a parent of the other, which is also what keeps the
    /// namespace a tree.
    pub fn mv(&self, source: &Path, dest: &Path, access: Access) -> Result<LockedInode<'_>, MoveError> {
        let (ancestor_path, src_rest, dst_rest) = source.common_ancestor(dest);
        let mut ancestor = self
            .find_locked(ancestor_path, Access::Unique)
            .map_err(|source| MoveError::InexistentCommonAncestor {
                path: ancestor_path.to_path_buf(),
                source,
            })?;
        if !ancestor.is_dir() {
            return Err(MoveError::CommonAncestorNotDir {
                path: ancestor_path.to_path_buf(),
            });
        }
        if src_rest.is_root() {
            return Err(MoveError::OriginDestinationParent);
        }
        if dst_rest.is_root() {
            return Err(MoveError::DestinationOriginParent);
        }

        let (src_parent_path, src_name) = src_rest.split_last();
        let (dst_parent_path, dst_name) = dst_rest.split_last();

        // Both entries live in the ancestor itself: a rename.
        if src_parent_path.is_root() && dst_parent_path.is_root() {
            let dir = ancestor.as_dir_mut().expect("ancestor is a directory");
            let Some(idx) = dir.search_by_name(src_name) else {
                return Err(MoveError::OriginNotFound {
                    name: display_name(src_name),
                });
            };
            dir.rename_entry(idx, dst_name).map_err(MoveError::RenameEntry)?;
            let moved = self.lock_slot(idx, access);
            drop(ancestor);
            return Ok(moved);
        }

        // Reach the two parent directories. The ancestor stays locked
        // `Unique` throughout, so conflicting moves below it serialize
        // here; the two descents enter distinct children of the ancestor
        // and take locks in disjoint subtrees.
        let mut src_parent = if src_parent_path.is_root() {
            None
        } else {
            let start = ancestor.as_dir().expect("ancestor is a directory");
            let parent = self
                .descend(start, src_parent_path, Access::Unique)
                .map_err(MoveError::InexistentOriginParentDir)?;
            if !parent.is_dir() {
                return Err(MoveError::OriginParentNotDir);
            }
            Some(parent)
        };
        let mut dst_parent = if dst_parent_path.is_root() {
            None
        } else {
            let start = ancestor.as_dir().expect("ancestor is a directory");
            let parent = self
                .descend(start, dst_parent_path, Access::Unique)
                .map_err(MoveError::InexistentDestinationParentDir)?;
            if !parent.is_dir() {
                return Err(MoveError::DestinationParentNotDir);
            }
            Some(parent)
        };

        let src_dir = match &src_parent {
            Some(parent) => parent.as_dir().expect("origin parent is a directory"),
            None => ancestor.as_dir().expect("ancestor is a directory"),
        };
        let Some(src_idx) = src_dir.search_by_name(src_name) else {
            return Err(MoveError::OriginNotFound {
                name: display_name(src_name),
            });
        };

        // Lock the inode being moved now, so it is returned already held.
        let moved = self.lock_slot(src_idx, access);

        // Add before removing: a failed add leaves the tree unchanged.
        let dst_dir = match &mut dst_parent {
            Some(parent) => parent.as_dir_mut().expect("destination parent is a directory"),
            None => ancestor.as_dir_mut().expect("ancestor is a directory"),
        };
        dst_dir.add_entry(src_idx, dst_name).map_err(MoveError::AddEntry)?;

        let src_dir = match &mut src_parent {
            Some(parent) => parent.as_dir_mut().expect("origin parent is a directory"),
            None => ancestor.as_dir_mut().expect("ancestor is a directory"),
        };
        let removed = src_dir.remove_entry(src_idx);
        debug_assert!(removed);

        drop(dst_parent);
        drop(src_parent);
        drop(ancestor);
        Ok(moved)
    }

    /// Prints the tree to `file_name`, one path per line; `-` means
    /// standard output.
    ///
    /// Each directory is enumerated under its `Shared` lock, which is held
    /// while its subtree is printed. Concurrent mutation is excluded from
    /// any one subtree but not from the tree as a whole, so the snapshot is
    /// consistent per subtree rather than globally.
    pub fn print(&self, file_name: &str) -> Result<(), PrintError> {
        if file_name == "-" {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            self.write_tree(&mut out).map_err(PrintError::Write)?;
            out.flush().map_err(PrintError::Write)
        } else {
            let file = fs::File::create(file_name).map_err(PrintError::Create)?;
            let mut out = io::BufWriter::new(file);
            self.write_tree(&mut out).map_err(PrintError::Write)?;
            out.flush().map_err(PrintError::Write)
        }
    }

    /// Writes the tree to `out`, one path per line, depth-first.
    pub fn write_tree<W>(&self, out: &mut W) -> io::Result<()>
    where
        W: io::Write,
    {
        self.print_tree(out, InodeIdx::ROOT, b"")
    }

    fn print_tree(&self, out: &mut dyn io::Write, idx: InodeIdx, prefix: &[u8]) -> io::Result<()> {
        let inode = self.lock_slot(idx, Access::Shared);
        if prefix.is_empty() {
            out.write_all(b"/")?;
        } else {
            out.write_all(prefix)?;
        }
        out.write_all(b"\n")?;
        if let Some(dir) = inode.as_dir() {
            for (name, child_idx) in dir.entries() {
                let mut child_prefix = prefix.to_vec();
                child_prefix.push(b'/');
                child_prefix.extend_from_slice(name.as_bytes());
                self.print_tree(out, child_idx, &child_prefix)?;
            }
        }
        Ok(())
    }

    /// Number of live inodes, the root included.
    #[must_use]
    pub fn live_inodes(&self) -> usize {
        self.table.live_count()
    }

    /// Locks the slot at `idx` and wraps it in a guard.
    fn lock_slot(&self, idx: InodeIdx, access: Access) -> LockedInode<'_> {
        let inode = self.table.slot(idx).expect("dangling inode index");
        inode.lock(access);
        LockedInode { inode, idx, access }
    }

    /// Resolves `path` from the root, hand-over-hand.
    ///
    /// Intermediate directories are locked `Shared` and released as soon as
    /// the next child's lock is acquired; the final inode is locked with
    /// `final_access` directly, while its parent is still held.
    fn find_locked(&self, path: &Path, final_access: Access) -> Result<LockedInode<'_>, FindError> {
        let path = path.trim();
        if path.is_root() {
            return Ok(self.lock_slot(InodeIdx::ROOT, final_access));
        }

        let mut cur = self.lock_slot(InodeIdx::ROOT, Access::Shared);
        let mut rest = path;
        let mut done = Path::new(b"".as_slice());
        loop {
            let (name, next) = rest.split_first();
            let is_last = next.is_root();
            let Some(dir) = cur.as_dir() else {
                return Err(FindError::ParentsNotDir {
                    path: done.to_path_buf(),
                });
            };
            let Some(child_idx) = dir.search_by_name(name) else {
                return Err(FindError::NameNotFound {
                    path: prefix_of(path, name).to_path_buf(),
                });
            };
            let access = if is_last { final_access } else { Access::Shared };
            let child = self.lock_slot(child_idx, access);
            if is_last {
                return Ok(child);
            }
            done = prefix_of(path, name);
            // Assigning releases the parent, after the child was acquired.
            cur = child;
            rest = next;
        }
    }

    /// Walks `path` downward from the already-locked directory `start`,
    /// hand-over-hand, without touching the lock guarding `start` itself.
    fn descend(&self, start: &Dir, path: &Path, final_access: Access) -> Result<LockedInode<'_>, FindError> {
        let path = path.trim();
        debug_assert!(!path.is_root());

        let (name, mut rest) = path.split_first();
        let mut is_last = rest.is_root();
        let Some(idx) = start.search_by_name(name) else {
            return Err(FindError::NameNotFound {
                path: prefix_of(path, name).to_path_buf(),
            });
        };
        let mut cur = self.lock_slot(idx, if is_last { final_access } else { Access::Shared });
        let mut done = prefix_of(path, name);

        while !is_last {
            let (name, next) = rest.split_first();
            is_last = next.is_root();
            let Some(dir) = cur.as_dir() else {
                return Err(FindError::ParentsNotDir {
                    path: done.to_path_buf(),
                });
            };
            let Some(idx) = dir.search_by_name(name) else {
                return Err(FindError::NameNotFound {
                    path: prefix_of(path, name).to_path_buf(),
                });
            };
            let child = self.lock_slot(idx, if is_last { final_access } else { Access::Shared });
            done = prefix_of(path, name);
            cur = child;
            rest = next;
        }
        Ok(cur)
    }
}

impl Default for Fs {
    fn default() -> Self {
        Self::new()
    }
}

/// An inode whose lock is held by the current thread.
///
/// Returned by the [`Fs`] operations; the lock is released exactly once,
/// when the guard drops. Release the guard before starting another
/// operation: holding an inode while acquiring locks above it inverts the
/// root-to-leaf lock order and can deadlock.
pub struct LockedInode<'fs> {
    inode: &'fs Inode,
    idx: InodeIdx,
    access: Access,
}

impl LockedInode<'_> {
    #[must_use]
    pub fn idx(&self) -> InodeIdx {
        self.idx
    }

    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    #[must_use]
    pub fn ty(&self) -> InodeType {
        self.data().ty()
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.ty() == InodeType::Dir
    }

    #[must_use]
    pub fn as_dir(&self) -> Option<&Dir> {
        match self.data() {
            InodeData::Dir(dir) => Some(dir),
            InodeData::File(_) => None,
        }
    }

    #[must_use]
    pub fn as_dir_mut(&mut self) -> Option<&mut Dir> {
        match self.data_mut() {
            InodeData::Dir(dir) => Some(dir),
            InodeData::File(_) => None,
        }
    }

    /// Unlocks the inode.
    pub fn unlock(self) {
        // this is a no-op because the guard is dropped
    }

    fn data(&self) -> &InodeData {
        // Holding the lock keeps the payload live and unaliased by writers.
        unsafe { (*self.inode.data_ptr()).as_ref() }.expect("locked inode has no payload")
    }

    fn data_mut(&mut self) -> &mut InodeData {
        debug_assert_eq!(self.access, Access::Unique);
        // Unique access: no other reference to this payload exists.
        unsafe { (*self.inode.data_ptr()).as_mut() }.expect("locked inode has no payload")
    }
}

impl Drop for LockedInode<'_> {
    fn drop(&mut self) {
        self.inode.unlock();
    }
}

impl fmt::Debug for LockedInode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedInode")
            .field("idx", &self.idx)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Portion of `path` up to the end of `name`, which must borrow from it.
fn prefix_of<'p>(path: &'p Path, name: &[u8]) -> &'p Path {
    let start = path.as_bytes().as_ptr() as usize;
    let end = name.as_ptr() as usize + name.len() - start;
    Path::new(&path.as_bytes()[..end])
}

fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
