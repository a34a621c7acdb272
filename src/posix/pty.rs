//! Pseudo-terminal pairs for exercising ports without hardware.

use std::ffi::CStr;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use std::os::unix::prelude::*;

/// The master side of a pseudo-terminal. Ports are opened on `path()`, the slave device.
pub struct Pty {
    master: File,
    path: PathBuf,
}

impl Pty {
    pub fn open() -> Pty {
        let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        assert!(fd >= 0, "posix_openpt: {}", std::io::Error::last_os_error());

        let master = unsafe { File::from_raw_fd(fd) };

        assert_eq!(unsafe { libc::grantpt(fd) }, 0, "grantpt");
        assert_eq!(unsafe { libc::unlockpt(fd) }, 0, "unlockpt");

        Pty {
            master,
            path: slave_path(fd),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, data: &[u8]) {
        self.master.write_all(data).unwrap();
    }

    /// Reads from the master until `len` bytes have arrived.
    pub fn read_available(&mut self, len: usize) -> Vec<u8> {
        let mut received = vec![0u8; len];
        self.master.read_exact(&mut received).unwrap();
        received
    }
}

/// Polls `read` until it returns a non-empty chunk, failing the test after a few seconds.
pub fn read_until_nonempty<F>(mut read: F) -> Vec<u8>
where
    F: FnMut() -> Vec<u8>,
{
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        let chunk = read();
        if !chunk.is_empty() {
            return chunk;
        }
        assert!(Instant::now() < deadline, "no data arrived from pseudo-terminal");
        thread::sleep(Duration::from_millis(5));
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn slave_path(fd: RawFd) -> PathBuf {
    let mut buf = [0 as libc::c_char; 128];
    assert_eq!(unsafe { libc::ptsname_r(fd, buf.as_mut_ptr(), buf.len()) }, 0, "ptsname_r");

    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    PathBuf::from(std::ffi::OsStr::from_bytes(name.to_bytes()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn slave_path(fd: RawFd) -> PathBuf {
    use std::sync::Mutex;

    // ptsname() returns a static buffer
    static PTSNAME: Mutex<()> = Mutex::new(());
    let _guard = PTSNAME.lock().unwrap();

    let name = unsafe { libc::ptsname(fd) };
    assert!(!name.is_null(), "ptsname");

    let name = unsafe { CStr::from_ptr(name) };
    PathBuf::from(std::ffi::OsStr::from_bytes(name.to_bytes()))
}
