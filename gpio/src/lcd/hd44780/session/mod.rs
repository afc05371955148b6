//! [DisplaySession], one display driven as a small terminal.
//!
//! The session owns the bus engine and every bit of mutable display state: the display control
//! mask, autoscroll, the pending last-cell flag and the escape sequence parser. Operations that
//! run into a bus timeout or a misplaced address mark the session uninitialized, and the next
//! operation initializes the display again before doing anything else.
mod putc;
mod scroll;

use crate::lcd::hd44780::cgram::{self, CgramGlyph};
use crate::lcd::hd44780::charmap::CharMap;
use crate::lcd::hd44780::config::{DisplayConfig, TerminalMode};
use crate::lcd::hd44780::driver::{CursorDirection, GpioHD44780Driver, HD44780Driver};
use crate::lcd::hd44780::geometry::Geometry;
use crate::lcd::hd44780::port::LcdPort;
use crate::lcd::hd44780::{LcdError, LcdResult};
use log::{debug, info, warn};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

/// Numeric parameters an escape sequence may carry.
pub const MAX_PARAMETERS: usize = 2;

/// Where the byte stream parser currently is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PutState {
    #[default]
    Normal,
    /// After the UTF-8 lead byte of an umlaut.
    Umlaut,
    /// After the UTF-8 lead byte of a special character.
    SpecialChar,
    /// After `ESC`.
    Escape,
    /// After `ESC [`, collecting parameters.
    Control,
    /// After `ESC [ ?`.
    CursorMode,
}

/// The display on/off control mask.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct DisplayState {
    pub display: bool,
    pub cursor: bool,
    pub blink: bool,
}

/// [DisplaySession::write] gave up on a byte.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("{source} after {written} byte(s)")]
pub struct WriteError {
    /// Bytes handled before the failing one.
    pub written: usize,
    #[source]
    pub source: LcdError,
}

pub type BellHook = Box<dyn FnMut()>;

pub struct DisplaySession<P: LcdPort> {
    driver: GpioHD44780Driver<P>,
    geometry: Geometry,
    config: DisplayConfig,
    charmap: CharMap,
    display_state: DisplayState,
    autoscroll: bool,
    /// The last cell was written and the cursor parked at the start of the last row.
    last_char: bool,
    state: PutState,
    parameters: [u32; MAX_PARAMETERS],
    parameter_index: usize,
    has_parameters: bool,
    initialized: bool,
    bell: Option<BellHook>,
}

impl<P: LcdPort> DisplaySession<P> {
    /// Creates a session. The display is initialized by the first operation, or by [Self::init].
    ///
    /// # Errors
    /// - `LcdError::InvalidGeometry` for an unsupported column/row count.
    /// - `LcdError::OutOfRange` if the port is not as wide as the configured bus.
    pub fn new(port: P, config: DisplayConfig) -> LcdResult<Self> {
        let geometry = Geometry::new(config.columns, config.rows)?;
        if port.bus_width() != config.bus_width {
            return Err(LcdError::OutOfRange { what: "bus width", value: port.bus_width().lines().into() });
        }

        Ok(DisplaySession {
            driver: GpioHD44780Driver::new(port, config.timing),
            geometry,
            charmap: CharMap::new(&config.glyphs),
            display_state: DisplayState::default(),
            autoscroll: config.autoscroll,
            last_char: false,
            state: PutState::Normal,
            parameters: [0; MAX_PARAMETERS],
            parameter_index: 0,
            has_parameters: false,
            initialized: false,
            bell: None,
            config,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn charmap(&self) -> &CharMap {
        &self.charmap
    }

    pub fn display_state(&self) -> DisplayState {
        self.display_state
    }

    pub fn put_state(&self) -> PutState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_autoscroll(&self) -> bool {
        self.autoscroll
    }

    pub fn set_autoscroll(&mut self, enabled: bool) {
        debug!("Auto scroll {}", if enabled { "on" } else { "off" });
        self.autoscroll = enabled;
    }

    /// Gets whether the last cell is written and the next character scrolls or wraps first.
    pub fn is_last_char_pending(&self) -> bool {
        self.last_char
    }

    /// Sets what happens on `BEL` (`0x07`).
    pub fn set_bell_hook(&mut self, hook: impl FnMut() + 'static) {
        self.bell = Some(Box::new(hook));
    }

    pub fn set_yield_hook(&mut self, hook: impl FnMut() + 'static) {
        self.driver.set_yield_hook(hook);
    }

    pub fn set_error_hook(&mut self, hook: impl FnMut(&LcdError) + 'static) {
        self.driver.set_error_hook(hook);
    }

    pub fn driver(&self) -> &GpioHD44780Driver<P> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut GpioHD44780Driver<P> {
        &mut self.driver
    }

    pub fn port(&self) -> &P {
        self.driver.port()
    }

    pub fn port_mut(&mut self) -> &mut P {
        self.driver.port_mut()
    }

    /// Runs the power-on sequence and resets all session state.
    ///
    /// # Errors
    /// - `LcdError::BusTimeout` if the controller never becomes ready, the session stays uninitialized.
    pub fn init(&mut self) -> LcdResult<()> {
        info!("Initializing {} display", self.geometry);
        self.initialized = false;
        self.state = PutState::Normal;
        self.autoscroll = self.config.autoscroll;
        self.last_char = false;
        self.parameter_index = 0;
        self.display_state = DisplayState::default();

        self.driver.init(self.geometry.is_multiline())?;
        self.send_display_state()?;
        self.driver.set_entry_mode(CursorDirection::Right, false)?;
        if self.config.mode == TerminalMode::Full {
            cgram::load_predefined_glyphs(&mut self.driver, &self.config.glyphs)?;
        }
        self.driver.clear_display()?;
        self.display_state.display = true;
        self.send_display_state()?;

        self.initialized = true;
        Ok(())
    }

    /// Initializes the display if it's not, or not anymore after a failure.
    pub fn ensure_initialized(&mut self) -> LcdResult<()> {
        if !self.initialized {
            self.init()?;
        }
        Ok(())
    }

    /// Takes over a display an earlier session initialized, assuming it is on with the cursor
    /// hidden. Nothing is sent.
    pub fn attach(&mut self) {
        info!("Attaching to initialized {} display", self.geometry);
        self.display_state = DisplayState { display: true, cursor: false, blink: false };
        self.initialized = true;
    }

    /// Runs `op` on an initialized display, dropping the initialized state if `op` leaves the
    /// controller in an unknown state.
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> LcdResult<T>) -> LcdResult<T> {
        self.ensure_initialized()?;
        let result = op(self);
        if let Err(err) = &result {
            if err.needs_reinit() && self.initialized {
                warn!("Display needs to be initialized again: {}", err);
                self.initialized = false;
            }
        }
        result
    }

    fn send_display_state(&mut self) -> LcdResult<u8> {
        let DisplayState { display, cursor, blink } = self.display_state;
        self.driver.set_display_control(display, cursor, blink)
    }

    fn update_display_state(&mut self, update: impl FnOnce(&mut DisplayState)) -> LcdResult<()> {
        self.run(|session| {
            update(&mut session.display_state);
            session.send_display_state()?;
            Ok(())
        })
    }

    pub fn display_on(&mut self) -> LcdResult<()> {
        self.update_display_state(|state| state.display = true)
    }

    pub fn display_off(&mut self) -> LcdResult<()> {
        self.update_display_state(|state| state.display = false)
    }

    pub fn cursor_on(&mut self) -> LcdResult<()> {
        self.update_display_state(|state| state.cursor = true)
    }

    /// Hides the cursor, which also stops it blinking.
    pub fn cursor_off(&mut self) -> LcdResult<()> {
        self.update_display_state(|state| {
            state.cursor = false;
            state.blink = false;
        })
    }

    pub fn cursor_blink(&mut self) -> LcdResult<()> {
        self.update_display_state(|state| state.blink = true)
    }

    /// Reads the address counter, waiting for the controller if it is still busy.
    fn address(&mut self) -> LcdResult<u8> {
        let (busy, address) = self.driver.get_busy_flag_and_address()?;
        if busy {
            warn!("Display still busy, waiting");
            return self.driver.poll_until_ready();
        }
        Ok(address)
    }

    pub fn cursor_address(&mut self) -> LcdResult<u8> {
        self.run(Self::address)
    }

    /// Gets the 1-indexed row and column of the cursor.
    pub fn cursor_position(&mut self) -> LcdResult<(u8, u8)> {
        let address = self.cursor_address()?;
        Ok((self.geometry.row_of(address) + 1, self.geometry.column_of(address) + 1))
    }

    /// Moves the cursor to an address, dropping a pending last-cell flag.
    fn set_cursor(&mut self, address: u8) -> LcdResult<()> {
        self.last_char = false;
        self.driver.set_address(address)?;
        Ok(())
    }

    /// Moves the cursor to the 1-indexed `row` and `column`.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` for a position outside the display, nothing is sent.
    pub fn goto(&mut self, row: u8, column: u8) -> LcdResult<()> {
        let address = self.geometry.address(row, column)?;
        debug!("Cursor to row {} column {}", row, column);
        self.run(|session| session.set_cursor(address))
    }

    /// Moves the cursor to the top left cell, keeping the content.
    pub fn home(&mut self) -> LcdResult<()> {
        self.run(Self::return_home)
    }

    fn return_home(&mut self) -> LcdResult<()> {
        self.last_char = false;
        self.driver.return_home()?;
        Ok(())
    }

    pub fn clear(&mut self) -> LcdResult<()> {
        self.run(|session| {
            session.last_char = false;
            session.driver.clear_display()?;
            Ok(())
        })
    }

    /// Runs `op` and puts the cursor back where it was.
    fn keep_cursor<T>(&mut self, op: impl FnOnce(&mut Self) -> LcdResult<T>) -> LcdResult<T> {
        self.run(|session| {
            let address = session.address()?;
            let value = op(session)?;
            session.driver.set_address(address)?;
            Ok(value)
        })
    }

    /// Writes a custom glyph into CGRAM, the cursor stays where it was.
    ///
    /// # Errors
    /// - `LcdError::OutOfRange` if `slot` is above 7, nothing is sent.
    pub fn write_glyph(&mut self, slot: u8, glyph: &CgramGlyph) -> LcdResult<()> {
        if slot > cgram::MAX_SLOT {
            return Err(LcdError::OutOfRange { what: "CGRAM slot", value: slot.into() });
        }
        self.keep_cursor(|session| {
            cgram::load_glyph(&mut session.driver, glyph, slot)?;
            Ok(())
        })
    }

    /// Loads the configured glyph set into CGRAM again, the cursor stays where it was.
    pub fn load_default_glyphs(&mut self) -> LcdResult<()> {
        self.keep_cursor(|session| cgram::load_predefined_glyphs(&mut session.driver, &session.config.glyphs))
    }

    /// Reads the whole screen back as input bytes, one `\n` terminated line per row.
    ///
    /// Custom glyphs come back as the bytes that would write them. The cursor stays where it was.
    pub fn read_screen(&mut self) -> LcdResult<Vec<u8>> {
        self.keep_cursor(|session| {
            let rows = usize::from(session.geometry.rows());
            let columns = usize::from(session.geometry.columns());
            let mut out = Vec::with_capacity(rows * (columns * 2 + 1));
            for row in 0..session.geometry.rows() {
                for c in session.read_row(row)? {
                    session.charmap.translate_backward(c).push_to(&mut out);
                }
                out.push(b'\n');
            }
            Ok(out)
        })
    }
}

impl<P: LcdPort> Debug for DisplaySession<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySession")
            .field("driver", &self.driver)
            .field("geometry", &self.geometry)
            .field("display_state", &self.display_state)
            .field("autoscroll", &self.autoscroll)
            .field("last_char", &self.last_char)
            .field("state", &self.state)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}
