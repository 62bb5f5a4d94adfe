//! Directory inodes.

use core::fmt;

use arrayvec::ArrayVec;

use super::InodeIdx;

/// Maximum length of a directory entry name, in bytes.
pub const MAX_NAME_LEN: usize = 100;

/// A directory entry name, stored inline.
///
/// Names longer than [`MAX_NAME_LEN`] bytes are truncated on construction;
/// comparisons are byte-exact over the stored bytes. Callers that need
/// exact-match semantics for longer names must validate lengths themselves.
#[derive(Clone, PartialEq, Eq)]
pub struct EntryName {
    bytes: ArrayVec<u8, MAX_NAME_LEN>,
}

impl EntryName {
    /// Returns `None` if `name` is empty.
    #[must_use]
    pub fn new(name: &[u8]) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let len = name.len().min(MAX_NAME_LEN);
        let bytes = ArrayVec::try_from(&name[..len]).unwrap();
        Some(Self { bytes })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes))
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&String::from_utf8_lossy(&self.bytes), f)
    }
}

/// Payload of a directory inode: a growable set of named entries.
///
/// Entries are kept in slot order. Removing an entry leaves a free slot
/// behind that the next insertion reuses.
#[derive(Debug, Default)]
pub struct Dir {
    entries: Vec<Option<DirEntry>>,
}

#[derive(Debug, Clone)]
struct DirEntry {
    name: EntryName,
    idx: InodeIdx,
}

impl Dir {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` iff the directory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Looks up an entry by name.
    ///
    /// The query is truncated the same way stored names are, so a lookup
    /// with the untruncated original of a long name still matches.
    #[must_use]
    pub fn search_by_name(&self, name: &[u8]) -> Option<InodeIdx> {
        let name = EntryName::new(name)?;
        self.entries
            .iter()
            .flatten()
            .find(|entry| entry.name == name)
            .map(|entry| entry.idx)
    }

    /// Adds an entry pointing at `idx`.
    pub fn add_entry(&mut self, idx: InodeIdx, name: &[u8]) -> Result<(), AddEntryError> {
        let name = EntryName::new(name).ok_or(AddEntryError::EmptyName)?;

        let mut free = None;
        for (slot_idx, slot) in self.entries.iter().enumerate() {
            match slot {
                Some(entry) => {
                    if entry.name == name {
                        return Err(AddEntryError::DuplicateName { existing: entry.idx });
                    }
                }
                None => {
                    if free.is_none() {
                        free = Some(slot_idx);
                    }
                }
            }
        }

        let entry = Some(DirEntry { name, idx });
        match free {
            Some(slot_idx) => self.entries[slot_idx] = entry,
            None => {
                if self.entries.capacity() == 0 {
                    // Most directories hold at least a few entries; skip the
                    // smallest allocations.
                    self.entries.reserve(4);
                }
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Clears the entry pointing at `idx`. Returns whether one was found.
    pub fn remove_entry(&mut self, idx: InodeIdx) -> bool {
        for slot in &mut self.entries {
            if slot.as_ref().is_some_and(|entry| entry.idx == idx) {
                *slot = None;
                return true;
            }
        }
        false
    }

    /// Renames the entry pointing at `idx` to `new_name`.
    pub fn rename_entry(&mut self, idx: InodeIdx, new_name: &[u8]) -> Result<(), RenameEntryError> {
        let new_name = EntryName::new(new_name).ok_or(RenameEntryError::EmptyName)?;

        let mut target = None;
        for (slot_idx, slot) in self.entries.iter().enumerate() {
            let Some(entry) = slot else { continue };
            if entry.idx == idx {
                target = Some(slot_idx);
            } else if entry.name == new_name {
                return Err(RenameEntryError::DuplicateName { existing: entry.idx });
            }
        }

        let Some(target) = target else {
            return Err(RenameEntryError::NotFound { idx });
        };
        if let Some(entry) = &mut self.entries[target] {
            entry.name = new_name;
        }
        Ok(())
    }

    /// Iterates over the `(name, inode index)` pairs of the live entries.
    pub fn entries(&self) -> impl Iterator<Item = (&EntryName, InodeIdx)> {
        self.entries
            .iter()
            .flatten()
            .map(|entry| (&entry.name, entry.idx))
    }
}

/// Error of [`Dir::add_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AddEntryError {
    #[error("cannot add an entry with an empty name")]
    EmptyName,
    #[error("an entry with the same name already exists at inode {existing}")]
    DuplicateName { existing: InodeIdx },
}

/// Error of [`Dir::rename_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RenameEntryError {
    #[error("cannot rename an entry to an empty name")]
    EmptyName,
    #[error("an entry with the same name already exists at inode {existing}")]
    DuplicateName { existing: InodeIdx },
    #[error("no entry refers to inode {idx}")]
    NotFound { idx: InodeIdx },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(n: usize) -> InodeIdx {
        InodeIdx::new(n)
    }

    #[test]
    fn test_add_and_search() {
        let mut dir = Dir::new();
        assert!(dir.is_empty());
        dir.add_entry(idx(1), b"a").unwrap();
        dir.add_entry(idx(2), b"b").unwrap();
        assert!(!dir.is_empty());
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.search_by_name(b"a"), Some(idx(1)));
        assert_eq!(dir.search_by_name(b"b"), Some(idx(2)));
        assert_eq!(dir.search_by_name(b"c"), None);
    }

    #[test]
    fn test_add_empty_name() {
        let mut dir = Dir::new();
        assert_eq!(dir.add_entry(idx(1), b""), Err(AddEntryError::EmptyName));
    }

    #[test]
    fn test_add_duplicate_name() {
        let mut dir = Dir::new();
        dir.add_entry(idx(1), b"a").unwrap();
        assert_eq!(
            dir.add_entry(idx(2), b"a"),
            Err(AddEntryError::DuplicateName { existing: idx(1) })
        );
    }

    #[test]
    fn test_remove_entry() {
        let mut dir = Dir::new();
        dir.add_entry(idx(1), b"a").unwrap();
        assert!(dir.remove_entry(idx(1)));
        assert!(!dir.remove_entry(idx(1)));
        assert!(dir.is_empty());
        assert_eq!(dir.search_by_name(b"a"), None);
    }

    #[test]
    fn test_removed_slot_is_reused() {
        let mut dir = Dir::new();
        dir.add_entry(idx(1), b"a").unwrap();
        dir.add_entry(idx(2), b"b").unwrap();
        assert!(dir.remove_entry(idx(1)));
        dir.add_entry(idx(3), b"c").unwrap();
        // "c" took the slot "a" vacated.
        let names: Vec<_> = dir.entries().map(|(name, _)| name.as_bytes().to_vec()).collect();
        assert_eq!(names, [b"c".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_rename_entry() {
        let mut dir = Dir::new();
        dir.add_entry(idx(1), b"a").unwrap();
        dir.add_entry(idx(2), b"b").unwrap();
        dir.rename_entry(idx(1), b"z").unwrap();
        assert_eq!(dir.search_by_name(b"a"), None);
        assert_eq!(dir.search_by_name(b"z"), Some(idx(1)));
        assert_eq!(
            dir.rename_entry(idx(1), b"b"),
            Err(RenameEntryError::DuplicateName { existing: idx(2) })
        );
        assert_eq!(
            dir.rename_entry(idx(9), b"y"),
            Err(RenameEntryError::NotFound { idx: idx(9) })
        );
        // Renaming an entry to its own name is a no-op, not a collision.
        dir.rename_entry(idx(1), b"z").unwrap();
    }

    #[test]
    fn test_names_truncate_at_max_len() {
        let long: Vec<u8> = (0..150).map(|n| b'a' + (n % 26)).collect();
        let mut dir = Dir::new();
        dir.add_entry(idx(1), &long).unwrap();

        // The stored name is the first MAX_NAME_LEN bytes, and lookups with
        // the untruncated name still match.
        let (name, _) = dir.entries().next().unwrap();
        assert_eq!(name.as_bytes(), &long[..MAX_NAME_LEN]);
        assert_eq!(dir.search_by_name(&long), Some(idx(1)));
        assert_eq!(dir.search_by_name(&long[..MAX_NAME_LEN]), Some(idx(1)));

        // Two names that only differ past the truncation point collide.
        let mut other = long.clone();
        *other.last_mut().unwrap() = b'!';
        assert_eq!(
            dir.add_entry(idx(2), &other),
            Err(AddEntryError::DuplicateName { existing: idx(1) })
        );
    }
}
