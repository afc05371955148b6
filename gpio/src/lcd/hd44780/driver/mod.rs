mod gpio;

use crate::lcd::hd44780::{LcdError, LcdResult};
pub use gpio::*;
use log::error;
use std::fmt::Debug;

/// Highest CGRAM address, 8 glyphs of 8 rows.
pub const MAX_CGRAM_ADDRESS: u8 = 0b00111111;
/// Highest DDRAM address.
pub const MAX_DDRAM_ADDRESS: u8 = 0b01111111;

/// The HD44780 instruction set.
///
/// Every instruction waits for the controller to become ready again and returns the address
/// counter it reports afterwards.
pub trait HD44780Driver: Debug {
    /// Negotiates the bus width with the controller and sends the function set.
    ///
    /// Works from any controller state, including power-on and a half-finished 4-bit transfer.
    fn init(&mut self, two_lines: bool) -> LcdResult<u8>;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> LcdResult<u8> {
        self.send_command(0b00000001)
    }

    /// Sets the cursor to the home position.
    fn return_home(&mut self) -> LcdResult<u8> {
        self.send_command(0b00000010)
    }

    /// Sets the display to the specified entry mode.
    fn set_entry_mode(&mut self, cursor_direction: CursorDirection, shift: bool) -> LcdResult<u8> {
        let mut command = 0b00000100;
        if cursor_direction == CursorDirection::Right {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(&mut self, display_on: bool, cursor_on: bool, blink_on: bool) -> LcdResult<u8> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the data length, the number of lines and the font.
    fn function_set(&mut self, eight_bit: bool, two_lines: bool, font: bool) -> LcdResult<u8> {
        let mut command = 0b00100000;
        if eight_bit {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the CGRAM address.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` if the address is above [MAX_CGRAM_ADDRESS], nothing is sent.
    fn set_cgram_address(&mut self, address: u8) -> LcdResult<u8> {
        if address > MAX_CGRAM_ADDRESS {
            return Err(LcdError::OutOfRange { what: "CGRAM address", value: address.into() });
        }
        self.send_command(0b01000000 | address)
    }

    /// Sets the DDRAM address.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` if the address is above [MAX_DDRAM_ADDRESS], nothing is sent.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<u8> {
        if address > MAX_DDRAM_ADDRESS {
            return Err(LcdError::OutOfRange { what: "DDRAM address", value: address.into() });
        }
        self.send_command(0b10000000 | address)
    }

    /// Sets the DDRAM address and checks that the controller actually went there.
    ///
    /// # Errors
    /// - `LcdError::AddressMismatch` if the address counter reports a different address.
    fn set_address(&mut self, address: u8) -> LcdResult<u8> {
        let actual = self.set_ddram_address(address)?;
        if actual != address {
            error!("Unable to set address {:#04x}, controller reports {:#04x}", address, actual);
            let err = LcdError::AddressMismatch { expected: address, actual };
            self.report_error(&err);
            return Err(err);
        }
        Ok(actual)
    }

    /// Reads the busy flag and address counter.
    fn get_busy_flag_and_address(&mut self) -> LcdResult<(bool, u8)> {
        let status = self.read_command()?;
        let busy_flag = status & 0b10000000 != 0;
        let address = status & 0b01111111;
        Ok((busy_flag, address))
    }

    /// Writes a character to the current address.
    fn write_char(&mut self, c: u8) -> LcdResult<u8> {
        self.send_data(c)
    }

    /// Reads the character at the current address, the address counter moves on by one.
    fn read_char(&mut self) -> LcdResult<u8> {
        self.read_data()
    }

    /// Hands a failure to whoever watches the driver, before it is returned.
    fn report_error(&mut self, _err: &LcdError) {}

    // Low-level commands
    // These raw commands are used by the high-level functions above.
    // They are not meant to be used directly, but implemented by the driver implementation.

    /// Sends a command to the HD44780 controller and waits until it's done.
    /// Sets the RS pin to 0 (command).
    fn send_command(&mut self, command: u8) -> LcdResult<u8>;

    /// Sends data to the HD44780 controller and waits until it's done.
    /// Sets the RS pin to 1 (data).
    fn send_data(&mut self, data: u8) -> LcdResult<u8>;

    /// Reads the busy flag and address counter.
    /// Sets the RS pin to 0 (command).
    ///
    /// Returns both in a single u8, for easier usage use [Self::get_busy_flag_and_address], which
    /// uses this function internally.
    fn read_command(&mut self) -> LcdResult<u8>;

    /// Reads data from the HD44780 controller.
    /// Sets the RS pin to 1 (data).
    fn read_data(&mut self) -> LcdResult<u8>;
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing/reading data.
    Left,
    /// Moves the cursor to the right after writing/reading data.
    Right,
}
