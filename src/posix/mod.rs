//! Serial port implementation for POSIX-compliant operating systems.

pub use self::tty::*;

mod error;
mod tty;

pub(crate) use self::error::{from_open_error, DEFAULT_OPEN_FLAGS};

#[cfg(test)]
pub(crate) mod pty;
