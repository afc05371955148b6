//! Mapping between visible rows/columns and the controller's DDRAM addresses.
//!
//! In 2-line mode the DDRAM holds two 40-cell lines starting at `0x00` and `0x40`. Displays with
//! four rows split each of those in half, so row 2 continues line 0 and row 3 continues line 1:
//!
//! | row | start          |
//! |-----|----------------|
//! | 0   | `0x00`         |
//! | 1   | `0x40`         |
//! | 2   | `columns`      |
//! | 3   | `0x40+columns` |
use crate::lcd::hd44780::{LcdError, LcdResult};
use std::fmt::{Display, Formatter};

/// Offset of the second DDRAM line.
pub const LINE_SIZE: u8 = 0x40;

/// Column and row count of a display, fixed for the lifetime of a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    columns: u8,
    rows: u8,
}

impl Geometry {
    /// Creates a geometry.
    ///
    /// # Errors
    /// - `LcdError::InvalidGeometry` if `rows` is not 1, 2 or 4, or the columns don't fit the DDRAM
    ///   (80 for one row, 40 for two, 20 for four).
    pub fn new(columns: u8, rows: u8) -> LcdResult<Self> {
        let max_columns = match rows {
            1 => 80,
            2 => 40,
            4 => 20,
            _ => return Err(LcdError::InvalidGeometry { columns, rows }),
        };
        if columns < 1 || columns > max_columns {
            return Err(LcdError::InvalidGeometry { columns, rows });
        }
        Ok(Geometry { columns, rows })
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn last_row(&self) -> u8 {
        self.rows - 1
    }

    /// Gets the address of the first cell of `row` (0-indexed).
    ///
    /// `row` has to be below [Self::rows].
    pub fn line_start(&self, row: u8) -> u8 {
        debug_assert!(row < self.rows, "row {} outside of {}", row, self);
        match row {
            0 => 0,
            1 => LINE_SIZE,
            2 => self.columns,
            _ => self.columns + LINE_SIZE,
        }
    }

    /// Gets the row an address belongs to.
    ///
    /// Addresses in the gaps between rows belong to the row they follow in the address space,
    /// falling back to the highest row.
    pub fn row_of(&self, address: u8) -> u8 {
        if address < self.columns {
            return 0;
        }
        match self.rows {
            1 => 0,
            2 => 1,
            _ => {
                if address < LINE_SIZE {
                    2
                } else if address < LINE_SIZE + self.columns {
                    1
                } else {
                    3
                }
            }
        }
    }

    /// Gets the address of the first cell of the row `address` belongs to.
    pub fn line_start_of(&self, address: u8) -> u8 {
        self.line_start(self.row_of(address))
    }

    /// Gets the 0-indexed column of `address` within its row.
    ///
    /// Gap addresses give a column at or past [Self::columns]. On 2 rows the gap below `0x40`
    /// counts from the first row.
    pub fn column_of(&self, address: u8) -> u8 {
        address.checked_sub(self.line_start_of(address)).unwrap_or(address)
    }

    /// Gets the address of the cell at the 1-indexed `row` and `column`.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` if the row is not within `1..=rows` or the column not within `1..=columns`.
    pub fn address(&self, row: u8, column: u8) -> LcdResult<u8> {
        if row < 1 || row > self.rows {
            return Err(LcdError::OutOfRange { what: "row", value: row.into() });
        }
        if column < 1 || column > self.columns {
            return Err(LcdError::OutOfRange { what: "column", value: column.into() });
        }
        Ok(self.line_start(row - 1) + column - 1)
    }

    /// Gets the address of the bottom right cell.
    pub fn last_address(&self) -> u8 {
        self.line_start(self.last_row()) + self.columns - 1
    }

    /// Gets whether the display needs the controller in 2-line mode.
    pub fn is_multiline(&self) -> bool {
        self.rows > 1
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}
