//! Line options: the legal value table, raw option maps and their validation.

use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Serial port baud rates.
///
/// Only the rates in this enum can be applied to a port.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BaudRate {
    /** 50 baud. */      Baud50,
    /** 75 baud. */      Baud75,
    /** 110 baud. */     Baud110,
    /** 134 baud. */     Baud134,
    /** 150 baud. */     Baud150,
    /** 200 baud. */     Baud200,
    /** 300 baud. */     Baud300,
    /** 600 baud. */     Baud600,
    /** 1200 baud. */    Baud1200,
    /** 1800 baud. */    Baud1800,
    /** 2400 baud. */    Baud2400,
    /** 4800 baud. */    Baud4800,
    /** 9600 baud. */    Baud9600,
    /** 19,200 baud. */  Baud19200,
    /** 38,400 baud. */  Baud38400,
}

/// Number of bits per character.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CharSize {
    /** 5 bits per character. */ Bits5,
    /** 6 bits per character. */ Bits6,
    /** 7 bits per character. */ Bits7,
    /** 8 bits per character. */ Bits8,
}

/// Number of stop bits.
///
/// Stop bits are transmitted after every character.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StopBits {
    /// One stop bit.
    Stop1,

    /// Two stop bits.
    Stop2,
}

/// Parity checking modes.
///
/// The numeric option values are `0` for none, `1` for odd and `2` for even.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Parity {
    /// No parity bit.
    ParityNone,

    /// Parity bit sets odd number of 1 bits.
    ParityOdd,

    /// Parity bit sets even number of 1 bits.
    ParityEven,
}

macro_rules! option_values {
    ($ty:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl $ty {
            /// Every legal value, in ascending numeric order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Looks up the variant for a numeric option value.
            ///
            /// Returns `None` unless `value` is exactly one of the legal values.
            pub fn from_value(value: i64) -> Option<Self> {
                match value {
                    $($value => Some($ty::$variant),)+
                    _ => None,
                }
            }

            /// Returns the numeric option value.
            pub fn value(self) -> i64 {
                match self {
                    $($ty::$variant => $value,)+
                }
            }
        }
    };
}

option_values!(BaudRate {
    Baud50 = 50,
    Baud75 = 75,
    Baud110 = 110,
    Baud134 = 134,
    Baud150 = 150,
    Baud200 = 200,
    Baud300 = 300,
    Baud600 = 600,
    Baud1200 = 1200,
    Baud1800 = 1800,
    Baud2400 = 2400,
    Baud4800 = 4800,
    Baud9600 = 9600,
    Baud19200 = 19200,
    Baud38400 = 38400,
});

option_values!(CharSize {
    Bits5 = 5,
    Bits6 = 6,
    Bits7 = 7,
    Bits8 = 8,
});

option_values!(StopBits {
    Stop1 = 1,
    Stop2 = 2,
});

option_values!(Parity {
    ParityNone = 0,
    ParityOdd = 1,
    ParityEven = 2,
});

/// The four recognized option names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LineOption {
    /// Baud rate (`baud`).
    Baud,

    /// Data bits per character (`bits`).
    Bits,

    /// Stop bits (`stop`).
    Stop,

    /// Parity checking (`parity`).
    Parity,
}

impl LineOption {
    /// Every option, in `baud`, `bits`, `stop`, `parity` order.
    pub const ALL: [LineOption; 4] = [
        LineOption::Baud,
        LineOption::Bits,
        LineOption::Stop,
        LineOption::Parity,
    ];

    /// The key used for this option in an `Options` map.
    pub fn name(self) -> &'static str {
        match self {
            LineOption::Baud => "baud",
            LineOption::Bits => "bits",
            LineOption::Stop => "stop",
            LineOption::Parity => "parity",
        }
    }

    /// Looks up an option by key. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        LineOption::ALL.iter().copied().find(|option| option.name() == name)
    }
}

impl fmt::Display for LineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated set of line settings.
///
/// Each field is `None` when the option was not supplied. Values are only produced by
/// [`Options::validate`] or from a complete [`Configuration`], so every present field is legal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LineSettings {
    pub baud_rate: Option<BaudRate>,
    pub char_size: Option<CharSize>,
    pub stop_bits: Option<StopBits>,
    pub parity: Option<Parity>,
}

impl LineSettings {
    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        *self == LineSettings::default()
    }
}

impl From<Configuration> for LineSettings {
    fn from(configuration: Configuration) -> Self {
        LineSettings {
            baud_rate: Some(configuration.baud_rate),
            char_size: Some(configuration.char_size),
            stop_bits: Some(configuration.stop_bits),
            parity: Some(configuration.parity),
        }
    }
}

/// A complete line configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    /// Baud rate.
    pub baud_rate: BaudRate,

    /// Character size.
    pub char_size: CharSize,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,
}

/// The configuration every port is given when it is opened: 9600 baud, 8 data bits, 1 stop bit,
/// no parity.
pub const DEFAULT_CONFIGURATION: Configuration = Configuration {
    baud_rate: BaudRate::Baud9600,
    char_size: CharSize::Bits8,
    stop_bits: StopBits::Stop1,
    parity: Parity::ParityNone,
};

impl Default for Configuration {
    fn default() -> Self {
        DEFAULT_CONFIGURATION
    }
}

impl Configuration {
    /// Returns this configuration with every field present in `settings` replaced.
    pub fn overlay(&self, settings: &LineSettings) -> Configuration {
        Configuration {
            baud_rate: settings.baud_rate.unwrap_or(self.baud_rate),
            char_size: settings.char_size.unwrap_or(self.char_size),
            stop_bits: settings.stop_bits.unwrap_or(self.stop_bits),
            parity: settings.parity.unwrap_or(self.parity),
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Options::from(*self))
    }
}

/// An option map as supplied by a caller, before validation.
///
/// Entries keep their insertion order, which is the order [`validate`](Options::validate)
/// checks them in. Setting a key that is already present replaces its value in place.
///
/// ```
/// use serial_line::Options;
///
/// let options = Options::new().set("baud", 38400).set("bits", 8);
/// assert_eq!(options.get("baud"), Some(38400));
///
/// let parsed: Options = "baud=38400,bits=8".parse().unwrap();
/// assert_eq!(parsed, options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    entries: Vec<(String, i64)>,
}

impl Options {
    /// Creates an empty option map.
    pub fn new() -> Self {
        Options { entries: Vec::new() }
    }

    /// Sets `key` to `value` and returns the map.
    pub fn set<K: Into<String>>(mut self, key: K, value: i64) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets `key` to `value`, returning the previous value if the key was present.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: i64) -> Option<i64> {
        let key = key.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns the value stored for `key`.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.entries.iter().find(|(k, _)| k == key).map(|&(_, v)| v)
    }

    /// Returns the number of entries, including unrecognized keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries have been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Validates every entry against the legal value table.
    ///
    /// Entries are checked in insertion order. For each entry the key is checked first and then
    /// its value; the first failure is returned and nothing after it is looked at.
    ///
    /// ## Errors
    ///
    /// * `UnknownOption` if a key is not one of `baud`, `bits`, `stop` or `parity`.
    /// * `InvalidOptionValue` if a value is not in its option's legal set.
    pub fn validate(&self) -> Result<LineSettings> {
        let mut settings = LineSettings::default();

        for (key, value) in self.iter() {
            let option = match LineOption::from_name(key) {
                Some(option) => option,
                None => return Err(Error::UnknownOption(key.to_string())),
            };

            let invalid = || Error::InvalidOptionValue {
                option: key.to_string(),
                value: value.to_string(),
            };

            match option {
                LineOption::Baud => {
                    settings.baud_rate = Some(BaudRate::from_value(value).ok_or_else(invalid)?)
                }
                LineOption::Bits => {
                    settings.char_size = Some(CharSize::from_value(value).ok_or_else(invalid)?)
                }
                LineOption::Stop => {
                    settings.stop_bits = Some(StopBits::from_value(value).ok_or_else(invalid)?)
                }
                LineOption::Parity => {
                    settings.parity = Some(Parity::from_value(value).ok_or_else(invalid)?)
                }
            }
        }

        Ok(settings)
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

impl From<Configuration> for Options {
    fn from(configuration: Configuration) -> Self {
        Options::new()
            .set(LineOption::Baud.name(), configuration.baud_rate.value())
            .set(LineOption::Bits.name(), configuration.char_size.value())
            .set(LineOption::Stop.name(), configuration.stop_bits.value())
            .set(LineOption::Parity.name(), configuration.parity.value())
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Parses `key=value` pairs separated by commas, e.g. `baud=38400,bits=8,stop=1,parity=0`.
///
/// Keys are not checked here; that happens in [`Options::validate`]. An entry without `=` is
/// reported as `UnknownOption` and a value that is not an integer as `InvalidOptionValue`.
impl FromStr for Options {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut options = Options::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = match entry.find('=') {
                Some(idx) => (entry[..idx].trim(), entry[idx + 1..].trim()),
                None => return Err(Error::UnknownOption(entry.to_string())),
            };

            let value = value.parse::<i64>().map_err(|_| Error::InvalidOptionValue {
                option: key.to_string(),
                value: value.to_string(),
            })?;

            options.insert(key, value);
        }

        Ok(options)
    }
}
