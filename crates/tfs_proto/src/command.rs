//! Executable commands.

use core::{fmt, str::FromStr};

use tfs_types::{InodeType, PathBuf};

use crate::MAX_PATH_LEN;

/// A fully described command, as executed by the server workers.
///
/// The text form is one line, `<cmd> <arg1>[ <arg2>]`, with
/// whitespace-separated tokens:
///
/// | line            | command                      |
/// |-----------------|------------------------------|
/// | `c <path> <f\|d>` | create a file / directory  |
/// | `l <path>`      | search for a path            |
/// | `d <path>`      | remove a path                |
/// | `m <src> <dst>` | move a path                  |
/// | `p <file>`      | print the tree to a file     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Creates an inode of type `ty` at `path`.
    Create { path: PathBuf, ty: InodeType },
    /// Searches the file system for `path`.
    Search { path: PathBuf },
    /// Removes the inode at `path`.
    Remove { path: PathBuf },
    /// Moves the inode at `source` to `dest`.
    Move { source: PathBuf, dest: PathBuf },
    /// Prints the file system tree to `file_name` (`-` means stdout).
    Print { file_name: String },
}

/// Error of parsing a [`Command`] from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no command was supplied")]
    NoCommand,
    #[error("invalid command `{command}`")]
    InvalidCommand { command: char },
    #[error("no path was supplied")]
    NoPath,
    #[error("path is longer than {} bytes", MAX_PATH_LEN)]
    PathTooLong,
    #[error("no type was supplied")]
    NoType,
    #[error("invalid type `{ty}`")]
    InvalidType { ty: char },
    #[error("no destination path was supplied")]
    NoDestination,
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let command = tokens.next().ok_or(ParseError::NoCommand)?;

        match command {
            "c" => {
                let path = path_token(&mut tokens)?;
                let ty = tokens.next().ok_or(ParseError::NoType)?;
                let ty = match ty {
                    "f" => InodeType::File,
                    "d" => InodeType::Dir,
                    _ => {
                        return Err(ParseError::InvalidType {
                            ty: ty.chars().next().unwrap_or('?'),
                        });
                    }
                };
                Ok(Self::Create { path, ty })
            }
            "l" => Ok(Self::Search {
                path: path_token(&mut tokens)?,
            }),
            "d" => Ok(Self::Remove {
                path: path_token(&mut tokens)?,
            }),
            "m" => {
                let source = path_token(&mut tokens)?;
                let dest = path_token(&mut tokens).map_err(|err| match err {
                    ParseError::NoPath => ParseError::NoDestination,
                    other => other,
                })?;
                Ok(Self::Move { source, dest })
            }
            "p" => {
                let file_name = tokens.next().ok_or(ParseError::NoPath)?;
                Ok(Self::Print {
                    file_name: file_name.to_owned(),
                })
            }
            _ => Err(ParseError::InvalidCommand {
                command: command.chars().next().unwrap_or('?'),
            }),
        }
    }
}

fn path_token(tokens: &mut core::str::SplitWhitespace<'_>) -> Result<PathBuf, ParseError> {
    let token = tokens.next().ok_or(ParseError::NoPath)?;
    if token.len() > MAX_PATH_LEN {
        return Err(ParseError::PathTooLong);
    }
    Ok(PathBuf::from(token))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, ty } => {
                let ty = match ty {
                    InodeType::File => 'f',
                    InodeType::Dir => 'd',
                };
                write!(f, "c {} {ty}", path.display())
            }
            Self::Search { path } => write!(f, "l {}", path.display()),
            Self::Remove { path } => write!(f, "d {}", path.display()),
            Self::Move { source, dest } => {
                write!(f, "m {} {}", source.display(), dest.display())
            }
            Self::Print { file_name } => write!(f, "p {file_name}"),
        }
    }
}
