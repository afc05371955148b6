use crate::lcd::hd44780::charmap::{SPECIAL_CHAR_INTRODUCER, UMLAUT_INTRODUCER};
use crate::lcd::hd44780::config::{CarriageReturn, TerminalMode};
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::port::LcdPort;
use crate::lcd::hd44780::session::{DisplaySession, MAX_PARAMETERS, PutState, WriteError};
use crate::lcd::hd44780::{LcdError, LcdResult};
use log::{debug, trace, warn};

const ESC: u8 = 0x1B;
const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const VERTICAL_TAB: u8 = 0x0B;

impl<P: LcdPort> DisplaySession<P> {
    /// Feeds one byte through the terminal.
    pub fn put_byte(&mut self, c: u8) -> LcdResult<()> {
        self.run(|session| match session.config.mode {
            TerminalMode::Full => session.put_full(c),
            TerminalMode::Minimal => {
                session.driver.write_char(c)?;
                Ok(())
            }
        })
    }

    /// Feeds `bytes` through the terminal, stopping at the first failure.
    ///
    /// Returns the number of bytes written, which is all of them.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, WriteError> {
        for (written, &c) in bytes.iter().enumerate() {
            self.put_byte(c).map_err(|source| WriteError { written, source })?;
        }
        Ok(bytes.len())
    }

    fn transition(&mut self, state: PutState) {
        if self.state != state {
            debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn put_full(&mut self, c: u8) -> LcdResult<()> {
        let address = self.address()?;
        trace!("Put {:#04x} at {:#04x} in {:?}", c, address, self.state);

        match self.state {
            PutState::Normal => {}
            PutState::Umlaut | PutState::SpecialChar => {
                let glyph = if self.state == PutState::Umlaut {
                    self.charmap.translate_umlaut(c)
                } else {
                    self.charmap.translate_special(c)
                };
                self.transition(PutState::Normal);
                return match glyph {
                    Some(glyph) => self.put_glyph(address, glyph),
                    None => {
                        warn!("Character {:#04x} not found in the translation table", c);
                        Err(LcdError::UnknownCharacter(c))
                    }
                };
            }
            PutState::Escape => {
                if c == b'[' {
                    self.parameters = [0; MAX_PARAMETERS];
                    self.parameter_index = 0;
                    self.has_parameters = false;
                    self.transition(PutState::Control);
                } else {
                    self.transition(PutState::Normal);
                }
                return Ok(());
            }
            PutState::Control => {
                if let Some(result) = self.control(c) {
                    return result;
                }
            }
            PutState::CursorMode => return self.cursor_mode(c),
        }

        self.normal(address, c)
    }

    /// Handles a byte after `ESC [`, `None` if it doesn't belong to the sequence.
    fn control(&mut self, c: u8) -> Option<LcdResult<()>> {
        let result = match c {
            b'0'..=b'9' => {
                let parameter = &mut self.parameters[self.parameter_index];
                *parameter = parameter.saturating_mul(10).saturating_add(u32::from(c - b'0'));
                self.has_parameters = true;
                Ok(())
            }
            b';' => {
                self.parameter_index += 1;
                self.has_parameters = true;
                if self.parameter_index >= MAX_PARAMETERS {
                    warn!("Not more than {} parameters allowed in escape sequences", MAX_PARAMETERS);
                    self.parameter_index = 0;
                    self.transition(PutState::Normal);
                    Err(LcdError::TooManyParameters)
                } else {
                    Ok(())
                }
            }
            b'H' => {
                self.transition(PutState::Normal);
                if self.has_parameters {
                    self.parameter(0, "row").and_then(|row| {
                        let column = self.parameter(1, "column")?;
                        let address = self.geometry.address(row, column)?;
                        self.set_cursor(address)
                    })
                } else {
                    self.return_home()
                }
            }
            b'M' => {
                self.transition(PutState::Normal);
                self.parameter(0, "column").and_then(|column| self.delete_line(column))
            }
            b'J' => Ok(()),
            b'm' => {
                self.transition(PutState::Normal);
                Ok(())
            }
            b'?' => {
                self.transition(PutState::CursorMode);
                Ok(())
            }
            _ => {
                self.transition(PutState::Normal);
                return None;
            }
        };
        Some(result)
    }

    /// Gets a 1-indexed escape sequence parameter, where a missing or zero one counts as 1.
    fn parameter(&self, index: usize, what: &'static str) -> LcdResult<u8> {
        let value = self.parameters[index].max(1);
        u8::try_from(value).map_err(|_| LcdError::OutOfRange { what, value })
    }

    fn cursor_mode(&mut self, c: u8) -> LcdResult<()> {
        match c {
            b'2' | b'5' => Ok(()),
            b'h' => {
                self.transition(PutState::Normal);
                self.cursor_on()
            }
            b'l' => {
                self.transition(PutState::Normal);
                self.cursor_off()
            }
            _ => {
                self.transition(PutState::Normal);
                Ok(())
            }
        }
    }

    fn normal(&mut self, address: u8, c: u8) -> LcdResult<()> {
        match c {
            UMLAUT_INTRODUCER if self.charmap.is_unicode() => {
                self.transition(PutState::Umlaut);
                Ok(())
            }
            SPECIAL_CHAR_INTRODUCER if self.charmap.is_unicode() => {
                self.transition(PutState::SpecialChar);
                Ok(())
            }
            ESC => {
                self.transition(PutState::Escape);
                Ok(())
            }
            b'\n' => self.new_line(address),
            b'\r' => match self.config.carriage_return {
                CarriageReturn::NextLine => self.new_line(address),
                CarriageReturn::LineStart => self.set_cursor(self.geometry.line_start_of(address)),
            },
            BACKSPACE => self.backspace(address),
            VERTICAL_TAB => self.vertical_tab(address),
            BELL => {
                if let Some(bell) = self.bell.as_mut() {
                    bell();
                }
                Ok(())
            }
            _ => {
                let glyph = self.charmap.translate_forward(c);
                self.put_glyph(address, glyph)
            }
        }
    }

    fn new_line(&mut self, address: u8) -> LcdResult<()> {
        let row = self.geometry.row_of(address);
        if row < self.geometry.last_row() {
            return self.set_cursor(self.geometry.line_start(row + 1));
        }
        if self.autoscroll {
            self.scroll_up()
        } else {
            self.set_cursor(0)
        }
    }

    fn backspace(&mut self, address: u8) -> LcdResult<()> {
        let target = if self.last_char {
            self.geometry.last_address()
        } else if address == 0 {
            return Ok(());
        } else {
            let row = self.geometry.row_of(address);
            let start = self.geometry.line_start(row);
            if address == start {
                self.geometry.line_start(row - 1) + self.geometry.columns() - 1
            } else {
                start + self.geometry.column_of(address).min(self.geometry.columns()) - 1
            }
        };
        self.set_cursor(target)?;
        self.driver.write_char(b' ')?;
        self.set_cursor(target)
    }

    fn vertical_tab(&mut self, address: u8) -> LcdResult<()> {
        let row = self.geometry.row_of(address);
        if row < self.geometry.last_row() {
            let column = self.geometry.column_of(address).min(self.geometry.columns() - 1);
            return self.set_cursor(self.geometry.line_start(row + 1) + column);
        }
        if self.autoscroll {
            self.scroll_up()?;
        }
        self.set_cursor(address)
    }

    /// Writes a translated character and keeps the cursor inside the visible rows.
    fn put_glyph(&mut self, address: u8, glyph: u8) -> LcdResult<()> {
        let mut address = address;
        if self.last_char {
            if self.autoscroll {
                self.scroll_up()?;
                address = self.geometry.line_start(self.geometry.last_row());
            } else {
                self.set_cursor(0)?;
                address = 0;
            }
        }

        let row = self.geometry.row_of(address);
        let mut column = self.geometry.column_of(address);
        if column >= self.geometry.columns() {
            self.set_cursor(self.geometry.line_start(row))?;
            column = 0;
        }
        self.driver.write_char(glyph)?;

        if column + 1 >= self.geometry.columns() {
            if row == self.geometry.last_row() {
                self.set_cursor(self.geometry.line_start(row))?;
                self.last_char = true;
            } else {
                self.set_cursor(self.geometry.line_start(row + 1))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::lcd::hd44780::charmap::{POSITION_AE_SMALL, POSITION_DEGREE};
    use crate::lcd::hd44780::config::{CarriageReturn, DisplayConfig, GlyphOptions, TerminalMode};
    use crate::lcd::hd44780::driver::HD44780Driver;
    use crate::lcd::hd44780::session::tests::{screen, session, session_with};
    use crate::lcd::hd44780::session::{PutState, WriteError};
    use crate::lcd::hd44780::LcdError;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn glyph_write_advances_one_column() {
        let mut session = session(16, 2);
        session.goto(1, 5).unwrap();
        session.put_byte(b'x').unwrap();
        assert_eq!(session.cursor_position().unwrap(), (1, 6));
        assert_eq!(screen(&session)[0], "    x           ");
    }

    #[test]
    fn wraps_into_the_next_row() {
        let mut session = session(16, 2);
        session.write(b"0123456789abcdefXY").unwrap();
        assert_eq!(screen(&session), ["0123456789abcdef", "XY              "]);
        assert_eq!(session.cursor_position().unwrap(), (2, 3));
    }

    #[test]
    fn four_rows_wrap_in_display_order() {
        let mut session = session(4, 4);
        session.write(b"aaaabbbbccccdd").unwrap();
        assert_eq!(screen(&session), ["aaaa", "bbbb", "cccc", "dd  "]);
    }

    #[test]
    fn writing_past_the_last_cell_scrolls() {
        let mut session = session(4, 2);
        session.write(b"abcdefgh").unwrap();
        assert!(session.is_last_char_pending());
        assert_eq!(screen(&session), ["abcd", "efgh"]);

        session.put_byte(b'i').unwrap();
        assert!(!session.is_last_char_pending());
        assert_eq!(screen(&session), ["efgh", "i   "]);
    }

    #[test]
    fn without_autoscroll_the_last_cell_wraps_to_the_top() {
        let mut session = session(4, 2);
        session.set_autoscroll(false);
        session.write(b"abcdefghi").unwrap();
        assert_eq!(screen(&session), ["ibcd", "efgh"]);
        assert_eq!(session.cursor_position().unwrap(), (1, 2));
    }

    #[test]
    fn single_row_scrolls_itself() {
        let mut session = session(4, 1);
        session.write(b"abcde").unwrap();
        assert_eq!(screen(&session), ["e   "]);
    }

    #[test]
    fn escape_moves_the_cursor() {
        let mut session = session(20, 4);
        session.write(b"\x1b[3;5H").unwrap();
        assert_eq!(session.put_state(), PutState::Normal);
        assert_eq!(session.cursor_position().unwrap(), (3, 5));
        session.put_byte(b'*').unwrap();
        assert_eq!(screen(&session)[2], "    *               ");
    }

    #[test]
    fn escape_without_parameters_goes_home() {
        let mut session = session(16, 2);
        session.write(b"hello\n").unwrap();
        session.write(b"\x1b[H").unwrap();
        assert_eq!(session.cursor_position().unwrap(), (1, 1));
        assert_eq!(screen(&session)[0], "hello           ");
    }

    #[test]
    fn too_many_parameters_leave_the_cursor_alone() {
        let mut session = session(16, 2);
        session.goto(2, 2).unwrap();
        let err = session.write(b"\x1b[1;2;3H").unwrap_err();
        assert_eq!(err, WriteError { written: 5, source: LcdError::TooManyParameters });
        assert_eq!(session.put_state(), PutState::Normal);
        assert_eq!(session.cursor_position().unwrap(), (2, 2));
    }

    #[test]
    fn delete_line_escape() {
        let mut session = session(8, 2);
        session.write(b"abcdefg\x1b[3M").unwrap();
        assert_eq!(screen(&session)[0], "ab      ");
        assert_eq!(session.cursor_position().unwrap(), (1, 3));
    }

    #[test]
    fn attributes_and_erase_are_ignored() {
        let mut session = session(8, 2);
        session.write(b"\x1b[1;31mA\x1b[2JB").unwrap();
        assert_eq!(session.put_state(), PutState::Normal);
        assert_eq!(screen(&session)[0], "AB      ");
    }

    #[test]
    fn unknown_control_bytes_are_printed() {
        let mut session = session(8, 2);
        session.write(b"\x1b[x\x1bq").unwrap();
        assert_eq!(screen(&session)[0], "x       ");
    }

    #[test]
    fn cursor_visibility_escapes() {
        let mut session = session(16, 2);
        session.write(b"\x1b[?25h").unwrap();
        assert!(session.display_state().cursor);
        assert_eq!(session.put_state(), PutState::Normal);
        session.write(b"\x1b[?25l").unwrap();
        assert!(!session.display_state().cursor);
        assert_eq!(screen(&session)[0], " ".repeat(16));
    }

    #[test]
    fn umlauts_are_translated() {
        let mut session = session(16, 2);
        session.write("ä°".as_bytes()).unwrap();
        assert_eq!(session.port().data_writes(), vec![POSITION_AE_SMALL, POSITION_DEGREE]);
        assert_eq!(session.cursor_position().unwrap(), (1, 3));
    }

    #[test]
    fn code_page_437_umlauts_are_translated() {
        let mut session = session_with(DisplayConfig {
            glyphs: GlyphOptions { unicode: false, ..GlyphOptions::default() },
            ..DisplayConfig::default()
        });
        session.put_byte(0x84).unwrap();
        assert_eq!(session.port().data_writes(), vec![POSITION_AE_SMALL]);
    }

    #[test]
    fn unknown_umlaut_writes_nothing() {
        let mut session = session(16, 2);
        let err = session.write(&[0xC3, 0x41]).unwrap_err();
        assert_eq!(err.source, LcdError::UnknownCharacter(0x41));
        assert_eq!(err.written, 1);
        assert_eq!(session.put_state(), PutState::Normal);
        assert!(session.port().data_writes().is_empty());
    }

    #[test]
    fn new_line_moves_down_then_scrolls() {
        let mut session = session(8, 2);
        session.write(b"one\ntwo\nthree").unwrap();
        assert_eq!(screen(&session), ["two     ", "three   "]);
    }

    #[test]
    fn new_line_without_autoscroll_wraps() {
        let mut session = session(8, 2);
        session.set_autoscroll(false);
        session.write(b"one\ntwo\nX").unwrap();
        assert_eq!(screen(&session), ["Xne     ", "two     "]);
    }

    #[test]
    fn carriage_return_policy() {
        let mut session = session(8, 2);
        session.write(b"abc\rd").unwrap();
        assert_eq!(screen(&session), ["abc     ", "d       "]);

        let mut session = session_with(DisplayConfig {
            columns: 8,
            carriage_return: CarriageReturn::LineStart,
            ..DisplayConfig::default()
        });
        session.write(b"abc\rd").unwrap();
        assert_eq!(screen(&session), ["dbc     ", "        "]);
    }

    #[test]
    fn backspace_erases_across_rows() {
        let mut session = session(4, 2);
        session.write(b"abcde\x08\x08").unwrap();
        assert_eq!(screen(&session), ["abc ", "    "]);
        assert_eq!(session.cursor_position().unwrap(), (1, 4));
    }

    #[test]
    fn backspace_at_home_does_nothing() {
        let mut session = session(4, 2);
        session.put_byte(0x08).unwrap();
        assert!(session.port().data_writes().is_empty());
        assert_eq!(session.cursor_address().unwrap(), 0);
    }

    #[test]
    fn backspace_after_the_last_cell() {
        let mut session = session(4, 2);
        session.write(b"abcdefgh\x08").unwrap();
        assert!(!session.is_last_char_pending());
        assert_eq!(screen(&session), ["abcd", "efg "]);
        assert_eq!(session.cursor_position().unwrap(), (2, 4));
    }

    #[test]
    fn vertical_tab_keeps_the_column() {
        let mut session = session(8, 2);
        session.write(b"ab\x0bc").unwrap();
        assert_eq!(screen(&session), ["ab      ", "  c     "]);
        session.write(b"\x0bd").unwrap();
        assert_eq!(screen(&session), ["  c     ", "   d    "]);
    }

    #[test]
    fn vertical_tab_on_the_last_row_stays_without_autoscroll() {
        let mut session = session_with(DisplayConfig { columns: 8, rows: 2, autoscroll: false, ..DisplayConfig::default() });
        session.write(b"ab\ncd\x0b").unwrap();
        assert_eq!(screen(&session), ["ab      ", "cd      "]);
        assert_eq!(session.cursor_position().unwrap(), (2, 3));
        session.put_byte(b'e').unwrap();
        assert_eq!(screen(&session), ["ab      ", "cde     "]);
    }

    #[test]
    fn bell_rings_the_hook() {
        let rings = Rc::new(Cell::new(0));
        let mut session = session(8, 2);
        {
            let rings = rings.clone();
            session.set_bell_hook(move || rings.set(rings.get() + 1));
        }
        session.write(b"\x07a\x07").unwrap();
        assert_eq!(rings.get(), 2);
        assert_eq!(screen(&session)[0], "a       ");
    }

    #[test]
    fn minimal_mode_writes_bytes_as_they_are() {
        let mut session = session_with(DisplayConfig { mode: TerminalMode::Minimal, ..DisplayConfig::default() });
        session.write(b"\x1b[H\n").unwrap();
        assert_eq!(session.port().data_writes(), vec![0x1B, b'[', b'H', b'\n']);
        assert_eq!(session.put_state(), PutState::Normal);
    }

    #[test]
    fn unknown_cursor_mode_byte_is_dropped() {
        let mut session = session(8, 2);
        let display_control = session.port().display_control();
        session.write(b"ab\x1b[?x").unwrap();
        assert_eq!(session.put_state(), PutState::Normal);
        assert_eq!(screen(&session), ["ab      ", "        "]);
        assert_eq!(session.port().display_control(), display_control);
        assert_eq!(session.cursor_position().unwrap(), (1, 3));
        session.put_byte(b'c').unwrap();
        assert_eq!(screen(&session)[0], "abc     ");
    }

    #[test]
    fn cursor_in_the_hidden_ddram_gap_moves_to_the_second_row() {
        let mut session = session(16, 2);
        session.driver_mut().set_address(0x10).unwrap();
        assert_eq!(session.cursor_position().unwrap(), (2, 17));
        session.write(b"ab").unwrap();
        assert_eq!(screen(&session), ["                ", "ab              "]);
        assert_eq!(session.cursor_address().unwrap(), 0x42);
        assert_eq!(session.cursor_position().unwrap(), (2, 3));
    }
}
