//! Error taxonomy of the file system operations.
//!
//! Errors are plain values; every operation either applies its full effect
//! and returns `Ok`, or leaves the tree unchanged and returns one of these.

use std::io;

use tfs_types::PathBuf;

use crate::inode::{AddEntryError, RenameEntryError};

/// Error of [`Fs::find`](crate::Fs::find).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FindError {
    /// One of the path's parents was not a directory.
    #[error("entry `{}` is not a directory", .path.display())]
    ParentsNotDir { path: PathBuf },
    /// One of the path's components did not exist.
    #[error("entry `{}` does not exist", .path.display())]
    NameNotFound { path: PathBuf },
}

/// Error of [`Fs::create`](crate::Fs::create).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    #[error("unable to find parent directory `{}`", .parent.display())]
    InexistentParentDir {
        parent: PathBuf,
        #[source]
        source: FindError,
    },
    #[error("parent `{}` is not a directory", .parent.display())]
    ParentNotDir { parent: PathBuf },
    #[error("unable to add directory entry")]
    AddEntry(#[source] AddEntryError),
}

/// Error of [`Fs::remove`](crate::Fs::remove).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    #[error("unable to find parent directory `{}`", .parent.display())]
    InexistentParentDir {
        parent: PathBuf,
        #[source]
        source: FindError,
    },
    #[error("parent `{}` is not a directory", .parent.display())]
    ParentNotDir { parent: PathBuf },
    #[error("cannot find entry `{name}`")]
    NameNotFound { name: String },
    #[error("cannot remove non-empty directory `{name}`")]
    RemoveNonEmptyDir { name: String },
}

/// Error of [`Fs::mv`](crate::Fs::mv).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("unable to find common ancestor `{}`", .path.display())]
    InexistentCommonAncestor {
        path: PathBuf,
        #[source]
        source: FindError,
    },
    #[error("common ancestor `{}` is not a directory", .path.display())]
    CommonAncestorNotDir { path: PathBuf },
    #[error("origin path is a parent of the destination path")]
    OriginDestinationParent,
    #[error("destination path is a parent of the origin path")]
    DestinationOriginParent,
    #[error("unable to find the origin's parent directory")]
    InexistentOriginParentDir(#[source] FindError),
    #[error("unable to find the destination's parent directory")]
    InexistentDestinationParentDir(#[source] FindError),
    #[error("origin parent is not a directory")]
    OriginParentNotDir,
    #[error("destination parent is not a directory")]
    DestinationParentNotDir,
    #[error("cannot find origin entry `{name}`")]
    OriginNotFound { name: String },
    #[error("unable to add directory entry")]
    AddEntry(#[source] AddEntryError),
    #[error("unable to rename directory entry")]
    RenameEntry(#[source] RenameEntryError),
}

/// Error of [`Fs::print`](crate::Fs::print).
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    #[error("unable to create output file")]
    Create(#[source] io::Error),
    #[error("unable to write output file")]
    Write(#[source] io::Error),
}
