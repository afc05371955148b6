pub mod gpiod;
pub mod lcd;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the GPIO line at the given index.
    ///
    /// The line starts released (as an input) and stays claimed until the returned handle is dropped.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is already claimed.
    fn get_line(&self, index: usize) -> GpioResult<Box<dyn GpioLine + '_>>;
}

/// A single GPIO line whose direction can be switched at runtime.
///
/// The HD44780 bus needs this: the data lines are driven while writing and released while
/// the controller answers a read, and on some wirings the control lines are emulated as
/// open-drain by switching between a low output and a released input.
pub trait GpioLine: Debug {
    /// Gets the line number on its chip.
    fn index(&self) -> usize;

    /// Switches the line to output mode (if needed) and drives it to `level`.
    fn set_output(&mut self, level: bool) -> GpioResult<()>;

    /// Switches the line to input mode, leaving it floating or pulled by external resistors.
    fn set_input(&mut self) -> GpioResult<()>;

    /// Reads the current level of the line.
    ///
    /// For an output line this is the level it is driven to.
    fn read(&self) -> GpioResult<bool>;
}

/// Splits a byte into line levels, LSb first.
pub fn byte_to_levels<const N: usize>(value: u8) -> [bool; N] {
    let mut levels = [false; N];
    for (i, level) in levels.iter_mut().enumerate() {
        *level = (value & (1 << i)) != 0;
    }
    levels
}

/// Joins line levels into a byte, LSb first.
pub fn levels_to_byte(levels: &[bool]) -> u8 {
    let mut byte = 0u8;
    for (i, &level) in levels.iter().enumerate().take(8) {
        if level {
            byte |= 1 << i;
        }
    }
    byte
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_lsb_first() {
        assert_eq!(byte_to_levels::<4>(0b0110), [false, true, true, false]);
        assert_eq!(levels_to_byte(&[true, false, false, true]), 0b1001);
        assert_eq!(levels_to_byte(&byte_to_levels::<8>(0xA5)), 0xA5);
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err: GpioError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(err, GpioError::Io(std::io::ErrorKind::PermissionDenied));
    }
}
