use std::io;
use std::path::Path;

use libc::c_int;

use crate::error::Error;

/// Read-write access, the mode a port is opened with unless the caller asks otherwise.
pub const DEFAULT_OPEN_FLAGS: c_int = libc::O_RDWR;

/// Classifies an error from opening a device.
///
/// A path that vanished between the existence check and `open(2)` is still reported as a
/// missing device; everything else means the device is there but unusable.
pub fn from_open_error(path: &Path, err: io::Error) -> Error {
    use libc::{ENOENT, ENOSYS};

    match err.raw_os_error() {
        Some(ENOENT) => Error::DeviceNotFound(path.to_path_buf()),
        Some(ENOSYS) => Error::BackendUnavailable,
        _ => Error::OpenFailed {
            path: path.to_path_buf(),
            source: err,
        },
    }
}
