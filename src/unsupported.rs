//! Stand-in backend for targets without POSIX terminal I/O.
//!
//! Every open fails, so a `TtyPort` value can never exist.

use std::io;
use std::path::Path;

use crate::error::Error;
use crate::options::LineSettings;

/// Read-write access (`O_RDWR`), the mode a port is opened with unless the caller asks otherwise.
pub const DEFAULT_OPEN_FLAGS: i32 = 0o2;

pub fn from_open_error(_path: &Path, _err: io::Error) -> Error {
    Error::BackendUnavailable
}

#[derive(Debug, Clone, Copy)]
enum Void {}

fn absurd(void: Void) -> ! {
    match void {}
}

#[derive(Debug)]
pub struct TtyPort {
    void: Void,
}

#[derive(Debug)]
pub struct TtySettings {
    void: Void,
}

impl TtyPort {
    pub fn open(_path: &Path, _flags: i32) -> io::Result<Self> {
        Err(io::Error::new(io::ErrorKind::Other, "serial I/O is not supported on this platform"))
    }

    pub fn settings(&self) -> io::Result<TtySettings> {
        absurd(self.void)
    }

    pub fn apply_settings(&self, _settings: &LineSettings) -> io::Result<()> {
        absurd(self.void)
    }

    pub fn flush_buffers(&self) -> io::Result<()> {
        absurd(self.void)
    }
}

impl TtySettings {
    pub fn line_settings(&self) -> LineSettings {
        absurd(self.void)
    }
}

impl io::Read for &TtyPort {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        absurd(self.void)
    }
}

impl io::Write for &TtyPort {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        absurd(self.void)
    }

    fn flush(&mut self) -> io::Result<()> {
        absurd(self.void)
    }
}
