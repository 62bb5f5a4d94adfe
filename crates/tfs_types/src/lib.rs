//! Common value types shared by the tfs crates.

pub mod fs;
pub mod path;

pub use self::{
    fs::InodeType,
    path::{Path, PathBuf},
};
