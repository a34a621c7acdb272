use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A type alias for results of serial port operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur when interacting with serial ports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The device path does not exist.
    DeviceNotFound,

    /// The platform has no serial I/O support.
    BackendUnavailable,

    /// The device exists but could not be opened.
    OpenFailed,

    /// The default configuration could not be applied while opening the device.
    ConfigurationFailed,

    /// An option name is not recognized.
    UnknownOption,

    /// An option value is outside its legal set.
    InvalidOptionValue,

    /// The device rejected a valid configuration.
    AttributeSetFailed,

    /// The port has been closed.
    NotOpen,

    /// An I/O error occurred while reading or writing. The type of I/O error is determined by
    /// the inner `io::ErrorKind`.
    Io(io::ErrorKind),
}

/// An error type for serial port operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("serial device {} does not exist", .0.display())]
    DeviceNotFound(PathBuf),

    #[error("serial I/O is not supported on this platform")]
    BackendUnavailable,

    #[error("unable to open serial device {}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to apply default configuration to {}: {source}", .path.display())]
    ConfigurationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown line option `{0}`")]
    UnknownOption(String),

    #[error("invalid value `{value}` for line option `{option}`")]
    InvalidOptionValue { option: String, value: String },

    #[error("device rejected line configuration: {0}")]
    AttributeSetFailed(#[source] io::Error),

    #[error("serial port is not open")]
    NotOpen,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            Error::BackendUnavailable => ErrorKind::BackendUnavailable,
            Error::OpenFailed { .. } => ErrorKind::OpenFailed,
            Error::ConfigurationFailed { .. } => ErrorKind::ConfigurationFailed,
            Error::UnknownOption(_) => ErrorKind::UnknownOption,
            Error::InvalidOptionValue { .. } => ErrorKind::InvalidOptionValue,
            Error::AttributeSetFailed(_) => ErrorKind::AttributeSetFailed,
            Error::NotOpen => ErrorKind::NotOpen,
            Error::Io(ref err) => ErrorKind::Io(err.kind()),
        }
    }

    /// Returns `true` for errors caused by invalid option input rather than by the device.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnknownOption | ErrorKind::InvalidOptionValue
        )
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> io::Error {
        let kind = match error.kind() {
            ErrorKind::DeviceNotFound => io::ErrorKind::NotFound,
            ErrorKind::BackendUnavailable => io::ErrorKind::Other,
            ErrorKind::OpenFailed => io::ErrorKind::Other,
            ErrorKind::ConfigurationFailed => io::ErrorKind::Other,
            ErrorKind::UnknownOption => io::ErrorKind::InvalidInput,
            ErrorKind::InvalidOptionValue => io::ErrorKind::InvalidInput,
            ErrorKind::AttributeSetFailed => io::ErrorKind::InvalidInput,
            ErrorKind::NotOpen => io::ErrorKind::NotConnected,
            ErrorKind::Io(kind) => kind,
        };

        io::Error::new(kind, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_kind() {
        let err = Error::from(io::Error::new(io::ErrorKind::Interrupted, "signal"));
        assert_eq!(err.kind(), ErrorKind::Io(io::ErrorKind::Interrupted));
    }

    #[test]
    fn converts_into_io_error() {
        let err: io::Error = Error::NotOpen.into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);

        let err: io::Error = Error::UnknownOption("flow".to_string()).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = Error::InvalidOptionValue {
            option: "baud".to_string(),
            value: "1234".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value `1234` for line option `baud`");

        let err = Error::DeviceNotFound(PathBuf::from("/dev/ttyNOPE"));
        assert_eq!(err.to_string(), "serial device /dev/ttyNOPE does not exist");
    }

    #[test]
    fn classifies_validation_errors() {
        assert!(Error::UnknownOption("x".to_string()).is_validation());
        assert!(!Error::NotOpen.is_validation());
    }
}
