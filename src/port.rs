use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::options::{Configuration, LineSettings, Options, DEFAULT_CONFIGURATION};
use crate::sys::{self, TtyPort};

/// Number of bytes `read()` asks for, and the nominal buffer length for `write()`.
pub const DEFAULT_LENGTH: usize = 1024;

/// How long `write()` waits after every write so a slow peripheral can process the bytes.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_micros(200_000);

/// A serial port with a validated line configuration.
///
/// A `SerialPort` is open from the moment it is constructed until `close()` is called or the
/// value is dropped. Closing is final: a closed port can't be reopened, construct a new one
/// instead.
///
/// All I/O blocks the calling thread and no timeouts are applied. Each method takes `&mut self`,
/// so sharing a port between threads requires wrapping it in a mutex.
#[derive(Debug)]
pub struct SerialPort {
    device_path: PathBuf,
    handle: Option<TtyPort>,
    configuration: Configuration,
}

impl SerialPort {
    /// Opens a serial device for reading and writing and applies the default configuration
    /// (9600 baud, 8 data bits, 1 stop bit, no parity).
    ///
    /// ```no_run
    /// let port = serial_line::SerialPort::open("/dev/ttyS0").unwrap();
    /// assert!(port.is_open());
    /// ```
    ///
    /// ## Errors
    ///
    /// See [`open_with_flags`](SerialPort::open_with_flags).
    pub fn open<P: AsRef<Path>>(device_path: P) -> Result<Self> {
        SerialPort::open_with_flags(device_path, sys::DEFAULT_OPEN_FLAGS)
    }

    /// Opens a serial device with explicit `open(2)` flags and applies the default
    /// configuration.
    ///
    /// ## Errors
    ///
    /// * `DeviceNotFound` if `device_path` does not exist.
    /// * `BackendUnavailable` if the platform has no serial I/O support.
    /// * `OpenFailed` if the device exists but could not be opened, e.g. because of
    ///   permissions or because it is not a terminal device.
    /// * `ConfigurationFailed` if the default configuration could not be applied. The device is
    ///   closed again before returning.
    pub fn open_with_flags<P: AsRef<Path>>(device_path: P, flags: i32) -> Result<Self> {
        let device_path = device_path.as_ref();

        if !device_path.exists() {
            return Err(Error::DeviceNotFound(device_path.to_path_buf()));
        }

        let handle = TtyPort::open(device_path, flags)
            .map_err(|err| sys::from_open_error(device_path, err))?;

        SerialPort::with_handle(device_path, handle, apply_default_configuration)
    }

    /// Takes ownership of an open handle and prepares it with `configure`.
    ///
    /// The handle is dropped, and the device closed, if `configure` fails.
    fn with_handle<F>(device_path: &Path, handle: TtyPort, configure: F) -> Result<Self>
    where
        F: FnOnce(&TtyPort) -> io::Result<()>,
    {
        if let Err(err) = configure(&handle) {
            return Err(Error::ConfigurationFailed {
                path: device_path.to_path_buf(),
                source: err,
            });
        }

        debug!("opened {} ({})", device_path.display(), DEFAULT_CONFIGURATION);

        Ok(SerialPort {
            device_path: device_path.to_path_buf(),
            handle: Some(handle),
            configuration: DEFAULT_CONFIGURATION,
        })
    }

    /// Returns the path of the device this port was opened on.
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Returns the most recently applied configuration.
    ///
    /// This is what was written, not what the hardware reports. Use
    /// [`device_settings`](SerialPort::device_settings) to read the device.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Returns `true` until the port is closed.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns the underlying file descriptor, or `None` once the port is closed.
    ///
    /// The descriptor stays owned by the port.
    #[cfg(unix)]
    pub fn raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        use std::os::unix::io::AsRawFd;

        self.handle.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn handle(&self) -> Result<&TtyPort> {
        self.handle.as_ref().ok_or(Error::NotOpen)
    }

    /// Validates `options` and writes them to the device.
    ///
    /// Only the supplied options are changed; omitted ones keep whatever value the device
    /// currently has. On success the recorded configuration is updated with the supplied
    /// values.
    ///
    /// ```no_run
    /// use serial_line::{Options, SerialPort};
    ///
    /// let mut port = SerialPort::open("/dev/ttyUSB0").unwrap();
    /// port.apply_configuration(&Options::new().set("baud", 38400)).unwrap();
    /// ```
    ///
    /// ## Errors
    ///
    /// * `UnknownOption` or `InvalidOptionValue` if validation fails. Nothing is sent to the
    ///   device.
    /// * `NotOpen` if the port has been closed.
    /// * `AttributeSetFailed` if the device rejected the configuration. The recorded
    ///   configuration is left unchanged.
    pub fn apply_configuration(&mut self, options: &Options) -> Result<()> {
        let settings = options.validate()?;
        let handle = self.handle()?;

        handle.apply_settings(&settings).map_err(Error::AttributeSetFailed)?;

        self.configuration = self.configuration.overlay(&settings);
        debug!("configured {} ({})", self.device_path.display(), self.configuration);

        Ok(())
    }

    /// Reads the line settings the device currently holds.
    ///
    /// Fields whose device value is outside the legal option table are `None`.
    ///
    /// ## Errors
    ///
    /// * `NotOpen` if the port has been closed.
    /// * `Io` if the attributes could not be read.
    pub fn device_settings(&self) -> Result<LineSettings> {
        Ok(self.handle()?.settings()?.line_settings())
    }

    /// Reads up to [`DEFAULT_LENGTH`] bytes.
    ///
    /// See [`read_up_to`](SerialPort::read_up_to).
    pub fn read(&mut self) -> Result<Vec<u8>> {
        self.read_up_to(DEFAULT_LENGTH)
    }

    /// Reads up to `max_length` bytes with a single read from the device.
    ///
    /// Returns the bytes that were available, which may be fewer than requested or none at all.
    ///
    /// ## Errors
    ///
    /// * `NotOpen` if the port has been closed.
    /// * `Io` if the read failed.
    pub fn read_up_to(&mut self, max_length: usize) -> Result<Vec<u8>> {
        let mut handle = self.handle()?;

        let mut buf = vec![0u8; max_length];
        let len = handle.read(&mut buf)?;
        buf.truncate(len);

        Ok(buf)
    }

    /// Writes `data`, then waits [`DEFAULT_SETTLE_DELAY`].
    ///
    /// See [`write_with`](SerialPort::write_with).
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_with(data, DEFAULT_LENGTH, DEFAULT_SETTLE_DELAY)
    }

    /// Writes `data` with a single write to the device, then sleeps for `settle_delay`.
    ///
    /// `max_length` does not limit the write; the whole payload is handed to the device.
    /// The delay is applied after every write attempt, including a failed one. Returns the
    /// number of bytes the device accepted.
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use serial_line::SerialPort;
    ///
    /// let mut port = SerialPort::open("/dev/ttyUSB0").unwrap();
    /// port.write_with(b"AT RV\r", 1024, Duration::from_millis(50)).unwrap();
    /// ```
    ///
    /// ## Errors
    ///
    /// * `NotOpen` if the port has been closed. No delay is applied in this case.
    /// * `Io` if the write failed.
    pub fn write_with(&mut self, data: &[u8], max_length: usize, settle_delay: Duration) -> Result<usize> {
        let mut handle = self.handle()?;

        trace!("writing {} bytes (buffer length {})", data.len(), max_length);
        let written = handle.write(data);

        thread::sleep(settle_delay);

        Ok(written?)
    }

    /// Closes the port. Closing an already closed port does nothing.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("closing {}", self.device_path.display());
            drop(handle);
        }
    }
}

fn apply_default_configuration(handle: &TtyPort) -> io::Result<()> {
    handle.apply_settings(&LineSettings::from(DEFAULT_CONFIGURATION))?;
    handle.flush_buffers()
}

/// Opens a serial port with the default configuration.
///
/// Shorthand for [`SerialPort::open`].
///
/// ```no_run
/// use std::env;
///
/// for arg in env::args_os().skip(1) {
///     let port = serial_line::open(&arg).unwrap();
/// }
/// ```
pub fn open<P: AsRef<Path>>(device_path: P) -> Result<SerialPort> {
    SerialPort::open(device_path)
}
