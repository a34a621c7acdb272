//! Blocking serial port access with validated line configuration.
//!
//! A [`SerialPort`] opens a TTY device, gives it a default line configuration of 9600 baud,
//! 8 data bits, 1 stop bit and no parity, and then exchanges bytes with it. Line options are
//! supplied as an [`Options`] map keyed by `baud`, `bits`, `stop` and `parity`; every value is
//! checked against a fixed table before anything is sent to the device.
//!
//! Every write is followed by a settle delay (200 ms unless specified) that gives slow
//! peripherals time to process what was sent before the next operation.
//!
//! ```no_run
//! use serial_line::SerialPort;
//!
//! let mut port = SerialPort::open("/dev/ttyUSB0").unwrap();
//! port.apply_configuration(&"baud=38400,bits=8,stop=1,parity=0".parse().unwrap()).unwrap();
//!
//! port.write(b"AT RV\r").unwrap();
//! println!("res: {}", String::from_utf8_lossy(&port.read().unwrap()));
//! ```

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::options::{
    Configuration, LineOption, LineSettings, Options, DEFAULT_CONFIGURATION,
};
pub use crate::options::{BaudRate, CharSize, Parity, StopBits};
pub use crate::port::{open, SerialPort, DEFAULT_LENGTH, DEFAULT_SETTLE_DELAY};

pub use crate::options::BaudRate::*;
pub use crate::options::CharSize::*;
pub use crate::options::Parity::*;
pub use crate::options::StopBits::*;

mod error;
mod options;
mod port;

#[cfg(unix)]
pub mod posix;

#[cfg(not(unix))]
mod unsupported;

#[cfg(unix)]
use crate::posix as sys;

#[cfg(not(unix))]
use crate::unsupported as sys;
