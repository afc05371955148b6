//! HD44780 LCD module.
//!
//! The layers, from the wires up:
//! - [port]: the [LcdPort] contract for the RS, RW, EN and data lines, plus [GpioLcdPort] that
//!   builds it from [GpioLine](crate::GpioLine)s.
//! - [driver]: the [HD44780Driver] command set and [GpioHD44780Driver], the bus transaction
//!   engine that strobes nibbles or bytes and polls the busy flag with a bounded retry budget.
//! - [geometry]: mapping between row/column positions and the controller's DDRAM addresses.
//! - [charmap] and [cgram]: national-character translation and custom glyph loading.
//! - [session]: [DisplaySession], the terminal state machine fed one byte at a time.
//! - [command] and [status]: the command and status surfaces for the surrounding device layer.
//!
//! Everything here is synchronous and non-reentrant. Sessions are not `Send`, since the hooks and
//! GPIO lines are boxed trait objects: own the session on a single thread and funnel requests to it.

pub mod cgram;
pub mod charmap;
pub mod command;
pub mod config;
pub mod driver;
pub mod geometry;
pub mod port;
pub mod session;
pub mod status;

#[cfg(test)]
pub(crate) mod sim;

use crate::GpioError;
use thiserror::Error;

pub use cgram::CgramGlyph;
pub use charmap::{CharMap, ReadbackChar};
pub use command::{Command, CommandInfo};
pub use config::{BusTiming, CarriageReturn, Controller, DisplayConfig, GlyphOptions, TerminalMode};
pub use driver::{GpioHD44780Driver, HD44780Driver};
pub use geometry::Geometry;
pub use port::{BusWidth, GpioLcdPort, LcdLine, LcdPort};
pub use session::{DisplaySession, PutState};
pub use status::{PinStatus, Status};

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    /// The busy flag did not clear within the poll budget.
    #[error("display stayed busy after {retries} polls")]
    BusTimeout { retries: u32 },
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: u32 },
    /// The byte has no entry in the active translation table.
    #[error("character {0:#04x} not found in the translation table")]
    UnknownCharacter(u8),
    #[error("too many parameters in escape sequence, at most {} allowed", session::MAX_PARAMETERS)]
    TooManyParameters,
    /// The address counter did not land where it was set.
    #[error("unable to set address {expected:#04x}, controller reports {actual:#04x}")]
    AddressMismatch { expected: u8, actual: u8 },
    #[error("unsupported geometry {columns}x{rows}")]
    InvalidGeometry { columns: u8, rows: u8 },
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
}

impl LcdError {
    /// Gets whether the controller state is unknown after this error, so the display has to be
    /// initialized again before the next operation.
    pub fn needs_reinit(&self) -> bool {
        matches!(self, LcdError::BusTimeout { .. } | LcdError::AddressMismatch { .. } | LcdError::Gpio(_))
    }
}

pub type LcdResult<T> = Result<T, LcdError>;
