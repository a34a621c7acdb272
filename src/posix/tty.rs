use std::ffi::CString;
use std::io;
use std::path::Path;

use std::os::unix::prelude::*;

use libc::{c_int, c_void, size_t};
use log::{trace, warn};
use termios::Termios;

use crate::options::{BaudRate, CharSize, LineSettings, Parity, StopBits};

/// A TTY device opened for blocking serial I/O.
///
/// The descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct TtyPort {
    fd: RawFd,
}

impl TtyPort {
    /// Opens a TTY device.
    ///
    /// `flags` are the access mode flags for `open(2)`, usually `O_RDWR`. `O_NOCTTY` and
    /// `O_NONBLOCK` are always added so that opening a modem line does not wait for carrier;
    /// once open, the status flags are replaced with `O_SYNC`, which leaves the descriptor in
    /// blocking mode with synchronous writes.
    ///
    /// ## Errors
    ///
    /// Returns the OS error from `open(2)`, `ENOTTY` if the device is not a terminal, or the OS
    /// error from `fcntl(2)`. The descriptor is closed on every error path.
    pub fn open(path: &Path, flags: c_int) -> io::Result<Self> {
        use libc::{EINVAL, F_SETFL, O_NOCTTY, O_NONBLOCK, O_SYNC};

        let cstr = match CString::new(path.as_os_str().as_bytes()) {
            Ok(s) => s,
            Err(_) => return Err(io::Error::from_raw_os_error(EINVAL)),
        };

        let fd = unsafe { libc::open(cstr.as_ptr(), flags | O_NOCTTY | O_NONBLOCK, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let port = TtyPort { fd };

        if unsafe { libc::isatty(port.fd) } != 1 {
            return Err(io::Error::last_os_error());
        }

        // clear O_NONBLOCK, force synchronous writes
        if unsafe { libc::fcntl(port.fd, F_SETFL, O_SYNC) } < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(port)
    }

    /// Reads the device's current line attributes.
    pub fn settings(&self) -> io::Result<TtySettings> {
        Ok(TtySettings::new(Termios::from_fd(self.fd)?))
    }

    /// Writes the supplied line settings to the device in a single `tcsetattr` call.
    ///
    /// The current attributes are read first and only the fields present in `settings` are
    /// changed, so omitted options keep the values the device already had. The line is always
    /// left in raw binary mode.
    pub fn apply_settings(&self, settings: &LineSettings) -> io::Result<()> {
        use termios::{tcsetattr, TCSANOW};

        let mut tty = self.settings()?;
        tty.set_raw();
        tty.apply(settings)?;

        tcsetattr(self.fd, TCSANOW, &tty.termios)
    }

    /// Discards data received but not read and data written but not transmitted.
    pub fn flush_buffers(&self) -> io::Result<()> {
        use termios::{tcflush, TCIOFLUSH};

        tcflush(self.fd, TCIOFLUSH)
    }

    #[inline]
    fn read_impl(&self, buf: &mut [u8]) -> io::Result<usize> {
        let len = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut c_void, buf.len() as size_t) };

        if len >= 0 {
            trace!("read {} bytes from fd {}", len, self.fd);
            Ok(len as usize)
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[inline]
    fn write_impl(&self, buf: &[u8]) -> io::Result<usize> {
        let len = unsafe { libc::write(self.fd, buf.as_ptr() as *const c_void, buf.len() as size_t) };

        if len >= 0 {
            trace!("wrote {} of {} bytes to fd {}", len, buf.len(), self.fd);
            Ok(len as usize)
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[inline]
    fn flush_impl(&self) -> io::Result<()> {
        termios::tcdrain(self.fd)
    }
}

impl io::Read for TtyPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_impl(buf)
    }
}

impl io::Read for &TtyPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_impl(buf)
    }
}

impl io::Write for TtyPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_impl(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_impl()
    }
}

impl io::Write for &TtyPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_impl(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_impl()
    }
}

impl Drop for TtyPort {
    fn drop(&mut self) {
        if unsafe { libc::close(self.fd) } < 0 {
            warn!("failed to close fd {}: {}", self.fd, io::Error::last_os_error());
        }
    }
}

impl AsRawFd for TtyPort {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

/// Line attributes of a TTY device.
#[derive(Debug, Copy, Clone)]
pub struct TtySettings {
    termios: Termios,
}

impl TtySettings {
    fn new(termios: Termios) -> Self {
        TtySettings { termios }
    }

    /// Sets up the TTY for binary serial port access.
    fn set_raw(&mut self) {
        use termios::OPOST; // oflags
        use termios::{CLOCAL, CREAD}; // cflags
        use termios::{ECHO, ECHOE, ECHOK, ECHONL, ICANON, IEXTEN, ISIG}; // lflags
        use termios::{ICRNL, IGNBRK, IGNCR, INLCR}; // iflags
        use termios::{VMIN, VTIME}; // c_cc indexes

        self.termios.c_cflag |= CREAD | CLOCAL;
        self.termios.c_lflag &= !(ICANON | ECHO | ECHOE | ECHOK | ECHONL | ISIG | IEXTEN);
        self.termios.c_oflag &= !OPOST;
        self.termios.c_iflag &= !(INLCR | IGNCR | ICRNL | IGNBRK);

        // a read returns whatever is available, possibly nothing
        self.termios.c_cc[VMIN] = 0;
        self.termios.c_cc[VTIME] = 0;
    }

    fn apply(&mut self, settings: &LineSettings) -> io::Result<()> {
        if let Some(baud_rate) = settings.baud_rate {
            self.set_baud_rate(baud_rate)?;
        }
        if let Some(char_size) = settings.char_size {
            self.set_char_size(char_size);
        }
        if let Some(stop_bits) = settings.stop_bits {
            self.set_stop_bits(stop_bits);
        }
        if let Some(parity) = settings.parity {
            self.set_parity(parity);
        }
        Ok(())
    }

    /// Decodes the attributes into line settings. Fields the device holds a value for that is
    /// outside the legal option table are `None`.
    pub fn line_settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate(),
            char_size: self.char_size(),
            stop_bits: self.stop_bits(),
            parity: self.parity(),
        }
    }

    fn baud_rate(&self) -> Option<BaudRate> {
        use termios::{cfgetispeed, cfgetospeed};
        use termios::{
            B110, B1200, B134, B150, B1800, B19200, B200, B2400, B300, B38400, B4800, B50, B600,
            B75, B9600,
        };

        let ospeed = cfgetospeed(&self.termios);
        let ispeed = cfgetispeed(&self.termios);

        if ospeed != ispeed {
            return None;
        }

        match ospeed {
            B50 => Some(BaudRate::Baud50),
            B75 => Some(BaudRate::Baud75),
            B110 => Some(BaudRate::Baud110),
            B134 => Some(BaudRate::Baud134),
            B150 => Some(BaudRate::Baud150),
            B200 => Some(BaudRate::Baud200),
            B300 => Some(BaudRate::Baud300),
            B600 => Some(BaudRate::Baud600),
            B1200 => Some(BaudRate::Baud1200),
            B1800 => Some(BaudRate::Baud1800),
            B2400 => Some(BaudRate::Baud2400),
            B4800 => Some(BaudRate::Baud4800),
            B9600 => Some(BaudRate::Baud9600),
            B19200 => Some(BaudRate::Baud19200),
            B38400 => Some(BaudRate::Baud38400),

            _ => None,
        }
    }

    fn char_size(&self) -> Option<CharSize> {
        use termios::{CS5, CS6, CS7, CS8, CSIZE};

        match self.termios.c_cflag & CSIZE {
            CS8 => Some(CharSize::Bits8),
            CS7 => Some(CharSize::Bits7),
            CS6 => Some(CharSize::Bits6),
            CS5 => Some(CharSize::Bits5),

            _ => None,
        }
    }

    fn parity(&self) -> Option<Parity> {
        use termios::{PARENB, PARODD};

        if self.termios.c_cflag & PARENB != 0 {
            if self.termios.c_cflag & PARODD != 0 {
                Some(Parity::ParityOdd)
            } else {
                Some(Parity::ParityEven)
            }
        } else {
            Some(Parity::ParityNone)
        }
    }

    fn stop_bits(&self) -> Option<StopBits> {
        use termios::CSTOPB;

        if self.termios.c_cflag & CSTOPB != 0 {
            Some(StopBits::Stop2)
        } else {
            Some(StopBits::Stop1)
        }
    }

    fn set_baud_rate(&mut self, baud_rate: BaudRate) -> io::Result<()> {
        use termios::cfsetspeed;
        use termios::{
            B110, B1200, B134, B150, B1800, B19200, B200, B2400, B300, B38400, B4800, B50, B600,
            B75, B9600,
        };

        let baud = match baud_rate {
            BaudRate::Baud50 => B50,
            BaudRate::Baud75 => B75,
            BaudRate::Baud110 => B110,
            BaudRate::Baud134 => B134,
            BaudRate::Baud150 => B150,
            BaudRate::Baud200 => B200,
            BaudRate::Baud300 => B300,
            BaudRate::Baud600 => B600,
            BaudRate::Baud1200 => B1200,
            BaudRate::Baud1800 => B1800,
            BaudRate::Baud2400 => B2400,
            BaudRate::Baud4800 => B4800,
            BaudRate::Baud9600 => B9600,
            BaudRate::Baud19200 => B19200,
            BaudRate::Baud38400 => B38400,
        };

        cfsetspeed(&mut self.termios, baud)
    }

    fn set_char_size(&mut self, char_size: CharSize) {
        use termios::{CS5, CS6, CS7, CS8, CSIZE};

        let size = match char_size {
            CharSize::Bits5 => CS5,
            CharSize::Bits6 => CS6,
            CharSize::Bits7 => CS7,
            CharSize::Bits8 => CS8,
        };

        self.termios.c_cflag &= !CSIZE;
        self.termios.c_cflag |= size;
    }

    fn set_parity(&mut self, parity: Parity) {
        use termios::{IGNPAR, INPCK, PARENB, PARODD};

        match parity {
            Parity::ParityNone => {
                self.termios.c_cflag &= !(PARENB | PARODD);
                self.termios.c_iflag &= !INPCK;
                self.termios.c_iflag |= IGNPAR;
            }
            Parity::ParityOdd => {
                self.termios.c_cflag |= PARENB | PARODD;
                self.termios.c_iflag |= INPCK;
                self.termios.c_iflag &= !IGNPAR;
            }
            Parity::ParityEven => {
                self.termios.c_cflag &= !PARODD;
                self.termios.c_cflag |= PARENB;
                self.termios.c_iflag |= INPCK;
                self.termios.c_iflag &= !IGNPAR;
            }
        };
    }

    fn set_stop_bits(&mut self, stop_bits: StopBits) {
        use termios::CSTOPB;

        match stop_bits {
            StopBits::Stop1 => self.termios.c_cflag &= !CSTOPB,
            StopBits::Stop2 => self.termios.c_cflag |= CSTOPB,
        };
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::mem;
    use std::path::Path;

    use super::{TtyPort, TtySettings};
    use crate::options::*;
    use crate::posix::pty::{read_until_nonempty, Pty};

    fn default_settings() -> TtySettings {
        TtySettings {
            termios: unsafe { mem::zeroed() },
        }
    }

    #[test]
    fn tty_settings_sets_baud_rate() {
        let mut settings = default_settings();

        settings.set_baud_rate(BaudRate::Baud600).unwrap();
        assert_eq!(settings.baud_rate(), Some(BaudRate::Baud600));
    }

    #[test]
    fn tty_settings_overwrites_baud_rate() {
        let mut settings = default_settings();

        settings.set_baud_rate(BaudRate::Baud600).unwrap();
        settings.set_baud_rate(BaudRate::Baud38400).unwrap();
        assert_eq!(settings.baud_rate(), Some(BaudRate::Baud38400));
    }

    #[test]
    fn tty_settings_round_trips_every_baud_rate() {
        let mut settings = default_settings();

        for &baud_rate in BaudRate::ALL {
            settings.set_baud_rate(baud_rate).unwrap();
            assert_eq!(settings.baud_rate(), Some(baud_rate));
        }
    }

    #[test]
    fn tty_settings_overwrites_char_size() {
        let mut settings = default_settings();

        settings.set_char_size(CharSize::Bits8);
        settings.set_char_size(CharSize::Bits5);
        assert_eq!(settings.char_size(), Some(CharSize::Bits5));
    }

    #[test]
    fn tty_settings_sets_parity_odd() {
        let mut settings = default_settings();

        settings.set_parity(Parity::ParityOdd);
        assert_eq!(settings.parity(), Some(Parity::ParityOdd));
    }

    #[test]
    fn tty_settings_sets_parity_even() {
        let mut settings = default_settings();

        settings.set_parity(Parity::ParityOdd);
        settings.set_parity(Parity::ParityEven);
        assert_eq!(settings.parity(), Some(Parity::ParityEven));
    }

    #[test]
    fn tty_settings_sets_parity_none() {
        let mut settings = default_settings();

        settings.set_parity(Parity::ParityEven);
        settings.set_parity(Parity::ParityNone);
        assert_eq!(settings.parity(), Some(Parity::ParityNone));
    }

    #[test]
    fn tty_settings_sets_stop_bits() {
        let mut settings = default_settings();

        settings.set_stop_bits(StopBits::Stop2);
        assert_eq!(settings.stop_bits(), Some(StopBits::Stop2));

        settings.set_stop_bits(StopBits::Stop1);
        assert_eq!(settings.stop_bits(), Some(StopBits::Stop1));
    }

    #[test]
    fn tty_settings_applies_only_present_fields() {
        let mut settings = default_settings();
        settings.apply(&LineSettings::from(DEFAULT_CONFIGURATION)).unwrap();

        let partial = LineSettings {
            stop_bits: Some(StopBits::Stop2),
            ..LineSettings::default()
        };
        settings.apply(&partial).unwrap();

        let decoded = settings.line_settings();
        assert_eq!(decoded.baud_rate, Some(BaudRate::Baud9600));
        assert_eq!(decoded.char_size, Some(CharSize::Bits8));
        assert_eq!(decoded.stop_bits, Some(StopBits::Stop2));
        assert_eq!(decoded.parity, Some(Parity::ParityNone));
    }

    #[test]
    fn tty_settings_set_raw_disables_canonical_mode_and_echo() {
        use termios::{ECHO, ICANON, VMIN, VTIME};

        let mut settings = default_settings();
        settings.termios.c_lflag |= ICANON | ECHO;
        settings.termios.c_cc[VMIN] = 1;

        settings.set_raw();

        assert_eq!(settings.termios.c_lflag & (ICANON | ECHO), 0);
        assert_eq!(settings.termios.c_cc[VMIN], 0);
        assert_eq!(settings.termios.c_cc[VTIME], 0);
    }

    #[test]
    fn open_rejects_missing_device() {
        let err = TtyPort::open(Path::new("/dev/serial-line-missing"), libc::O_RDWR).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn open_rejects_non_terminal() {
        let err = TtyPort::open(Path::new("/dev/null"), libc::O_RDWR).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn applies_settings_to_pseudo_terminal() {
        let pty = Pty::open();
        let port = TtyPort::open(pty.path(), libc::O_RDWR).unwrap();

        let settings = Options::new()
            .set("baud", 19200)
            .set("stop", 2)
            .validate()
            .unwrap();
        port.apply_settings(&settings).unwrap();

        let decoded = port.settings().unwrap().line_settings();
        assert_eq!(decoded.baud_rate, Some(BaudRate::Baud19200));
        assert_eq!(decoded.stop_bits, Some(StopBits::Stop2));
    }

    #[test]
    fn transfers_bytes_through_pseudo_terminal() {
        let mut pty = Pty::open();
        let mut port = TtyPort::open(pty.path(), libc::O_RDWR).unwrap();
        port.apply_settings(&LineSettings::from(DEFAULT_CONFIGURATION)).unwrap();

        assert_eq!(port.write(b"ping").unwrap(), 4);
        port.flush().unwrap();
        assert_eq!(pty.read_available(4), b"ping");

        pty.write_all(b"pong");
        let received = read_until_nonempty(|| {
            let mut buf = [0u8; 16];
            let len = port.read(&mut buf).unwrap();
            buf[..len].to_vec()
        });
        assert!(b"pong".starts_with(&received));
    }
}
