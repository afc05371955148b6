//! Construction-time settings of a display session.
//!
//! Everything here is plain data with serde defaults, so a partial JSON file is enough.
use crate::lcd::hd44780::port::BusWidth;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub columns: u8,
    /// 1, 2 or 4.
    pub rows: u8,
    pub bus_width: BusWidth,
    pub timing: BusTiming,
    pub glyphs: GlyphOptions,
    pub mode: TerminalMode,
    pub carriage_return: CarriageReturn,
    /// Autoscroll state after initialization.
    pub autoscroll: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            columns: 16,
            rows: 2,
            bus_width: BusWidth::Four,
            timing: BusTiming::default(),
            glyphs: GlyphOptions::default(),
            mode: TerminalMode::Full,
            carriage_return: CarriageReturn::NextLine,
            autoscroll: true,
        }
    }
}

/// Delays and retry budget of the bus engine.
///
/// Slow wiring (long cables, level shifters) needs a longer `clock_wait_us`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusTiming {
    /// Settle time around every enable strobe edge, in microseconds.
    pub clock_wait_us: u32,
    /// Power-on wait before and during the width negotiation, in milliseconds.
    pub init_wait_ms: u32,
    /// Busy-flag reads before a transfer counts as timed out.
    pub max_poll: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        BusTiming {
            clock_wait_us: 50,
            init_wait_ms: 200,
            max_poll: 100,
        }
    }
}

/// The character ROM flavour of the controller, which decides where the umlauts live.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    /// HD44780 with the A00 ROM: all umlauts come from the ROM.
    #[default]
    Hd44780,
    /// ST7066U: the capital umlauts are missing from the ROM and get loaded into CGRAM.
    St7066u,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphOptions {
    pub controller: Controller,
    /// Translate German umlauts and ß.
    pub umlauts: bool,
    /// Input is UTF-8: umlauts arrive as `0xC3 xx` and special characters as `0xC2 xx`.
    /// Otherwise umlauts arrive as single code page 437 bytes.
    pub unicode: bool,
    /// Load a backslash glyph, the A00 ROM shows a yen sign at `\`.
    pub backslash: bool,
    /// Load a paragraph sign glyph.
    pub paragraph: bool,
}

impl Default for GlyphOptions {
    fn default() -> Self {
        GlyphOptions {
            controller: Controller::Hd44780,
            umlauts: true,
            unicode: true,
            backslash: false,
            paragraph: false,
        }
    }
}

/// Which state machine a session runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMode {
    /// Escape sequences, translation, control bytes and row wrapping.
    #[default]
    Full,
    /// Every byte is written to the display as is.
    Minimal,
}

/// What `\r` does.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarriageReturn {
    /// Same as `\n`.
    #[default]
    NextLine,
    /// Back to the start of the current row.
    LineStart,
}
