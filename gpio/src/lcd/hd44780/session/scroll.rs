use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::port::LcdPort;
use crate::lcd::hd44780::session::DisplaySession;
use crate::lcd::hd44780::{LcdError, LcdResult};
use log::debug;

impl<P: LcdPort> DisplaySession<P> {
    /// Reads the raw character codes of a row.
    pub(super) fn read_row(&mut self, row: u8) -> LcdResult<Vec<u8>> {
        self.driver.set_address(self.geometry.line_start(row))?;
        (0..self.geometry.columns()).map(|_| self.driver.read_char()).collect()
    }

    fn write_row(&mut self, row: u8, content: &[u8]) -> LcdResult<()> {
        self.driver.set_address(self.geometry.line_start(row))?;
        for &c in content {
            self.driver.write_char(c)?;
        }
        Ok(())
    }

    /// Fills a row with spaces from the 0-indexed `column` to its end.
    fn blank_row(&mut self, row: u8, column: u8) -> LcdResult<()> {
        self.driver.set_address(self.geometry.line_start(row) + column)?;
        for _ in column..self.geometry.columns() {
            self.driver.write_char(b' ')?;
        }
        Ok(())
    }

    /// Moves every row up by one and blanks the last one, the cursor goes to its start.
    pub fn scroll_up(&mut self) -> LcdResult<()> {
        self.run(|session| {
            debug!("Scrolling up");
            let last_row = session.geometry.last_row();
            for row in 0..last_row {
                let content = session.read_row(row + 1)?;
                session.write_row(row, &content)?;
            }
            session.blank_row(last_row, 0)?;
            session.set_cursor(session.geometry.line_start(last_row))
        })
    }

    /// Moves every row down by one and blanks the first one, the cursor goes home.
    pub fn scroll_down(&mut self) -> LcdResult<()> {
        self.run(|session| {
            debug!("Scrolling down");
            for row in (1..=session.geometry.last_row()).rev() {
                let content = session.read_row(row - 1)?;
                session.write_row(row, &content)?;
            }
            session.blank_row(0, 0)?;
            session.set_cursor(0)
        })
    }

    /// Blanks the cursor's row from the 1-indexed `column` on and moves the cursor there.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` if `column` is outside the display, nothing is sent.
    pub fn delete_line(&mut self, column: u8) -> LcdResult<()> {
        if column < 1 || column > self.geometry.columns() {
            return Err(LcdError::OutOfRange { what: "column", value: column.into() });
        }
        self.run(|session| {
            let address = session.address()?;
            let row = session.geometry.row_of(address);
            debug!("Deleting row {} from column {}", row + 1, column);
            session.blank_row(row, column - 1)?;
            session.set_cursor(session.geometry.line_start(row) + column - 1)
        })
    }
}
