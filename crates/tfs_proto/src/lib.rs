//! Wire protocol spoken between tfs clients and the server.
//!
//! A request is one datagram holding one ASCII command line (see
//! [`Command`]); a response is a single byte, [`RESPONSE_OK`] or
//! [`RESPONSE_ERR`].

pub use self::command::{Command, ParseError};

mod command;

/// Response byte sent for a successfully executed command.
pub const RESPONSE_OK: u8 = 0x01;

/// Response byte sent for a failed or unparseable command.
pub const RESPONSE_ERR: u8 = 0x00;

/// Maximum length of a path argument, in bytes.
pub const MAX_PATH_LEN: usize = 1024;

/// Maximum length of a request datagram: a path plus command overhead.
pub const MAX_REQUEST_LEN: usize = 2 * MAX_PATH_LEN + 8;
